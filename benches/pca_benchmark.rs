use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use eigenfaces::linalg_backends::{GramEighBackend, NdarrayLinAlgBackend};
use eigenfaces::Eigenfaces;
use ndarray::{Array, Array2};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;

// Random "images": n_samples rows of n_pixels intensities
fn generate_data(n_samples: usize, n_pixels: usize) -> Array2<f64> {
    Array::random((n_samples, n_pixels), Uniform::new(0., 255.))
}

// (samples, pixels) shaped like small face datasets: few images, many pixels
const SHAPES: [(usize, usize); 3] = [(20, 32 * 32), (50, 64 * 64), (100, 92 * 112)];

fn bench_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("Eigenfaces_fit");
    group.sample_size(10);

    for &(n_samples, n_pixels) in SHAPES.iter() {
        let data = generate_data(n_samples, n_pixels);
        let k = 10.min(n_samples);
        group.throughput(Throughput::Elements((n_samples * n_pixels) as u64));
        group.bench_with_input(
            BenchmarkId::new("economy_svd", format!("{}x{}", n_samples, n_pixels)),
            &data,
            |b, data| {
                b.iter(|| Eigenfaces::fit_with(&NdarrayLinAlgBackend, data.view(), k, false).unwrap())
            },
        );
        group.bench_with_input(
            BenchmarkId::new("gram_eigh", format!("{}x{}", n_samples, n_pixels)),
            &data,
            |b, data| b.iter(|| Eigenfaces::fit_with(&GramEighBackend, data.view(), k, false).unwrap()),
        );
    }
    group.finish();
}

fn bench_project_reconstruct(c: &mut Criterion) {
    let mut group = c.benchmark_group("Eigenfaces_project_reconstruct");

    for &(n_samples, n_pixels) in SHAPES.iter() {
        let data = generate_data(n_samples, n_pixels);
        let model = Eigenfaces::fit(data.view(), 10.min(n_samples)).unwrap();
        group.throughput(Throughput::Elements((n_samples * n_pixels) as u64));
        group.bench_with_input(
            BenchmarkId::new("roundtrip", format!("{}x{}", n_samples, n_pixels)),
            &data,
            |b, data| {
                b.iter(|| {
                    let z = model.project(data.view()).unwrap();
                    model.reconstruct(z.view()).unwrap()
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_fit, bench_project_reconstruct);
criterion_main!(benches);
