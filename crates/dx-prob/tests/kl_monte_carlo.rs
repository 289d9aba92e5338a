use approx::assert_relative_eq;
use ndarray::{Array1, ArrayD, Axis, array};

use dx_prob::{Chi2, Distribution, SphericalUniform, VonMisesFisher, kl_divergence};

fn normalize(v: &[f64]) -> Array1<f64> {
    let n = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    v.iter().map(|x| x / n).collect()
}

/// Sample mean of `log p(x) - log q(x)` with `x ~ p`.
fn monte_carlo_kl(p: &dyn Distribution, q: &dyn Distribution, n: usize, seed: u64) -> ArrayD<f64> {
    let x = p.sample_with_seed(&[n], seed).unwrap();
    let diff = &p.log_prob(&x).unwrap() - &q.log_prob(&x).unwrap();
    diff.mean_axis(Axis(0)).unwrap()
}

#[test]
fn vmf_to_uniform_is_zero_at_zero_concentration() {
    for dim in [2usize, 3, 5, 10, 20] {
        let mu: Vec<f64> = (0..5 * dim).map(|i| 1.0 + (i % 7) as f64 / 7.0).collect();
        let rows: Vec<f64> = mu.chunks(dim).flat_map(|r| normalize(r).to_vec()).collect();
        let mu = ArrayD::from_shape_vec(ndarray::IxDyn(&[5, dim]), rows).unwrap();
        let vmf = VonMisesFisher::new(mu, 0.0).unwrap();
        let su = SphericalUniform::new(dim, vec![]).unwrap();
        let kl = kl_divergence(&vmf, &su).unwrap();
        assert_eq!(kl.shape(), &[5]);
        assert!(kl.iter().all(|v| v.abs() < 1e-4), "dim={dim}: {kl:?}");
        let mc = monte_carlo_kl(&vmf, &su, 5_000, 3);
        assert!(mc.iter().all(|v| v.abs() < 1e-8), "dim={dim}: {mc:?}");
    }
}

#[test]
fn vmf_to_uniform_matches_monte_carlo() {
    for dim in [2usize, 3, 5, 10, 20] {
        let mu = normalize(&(0..dim).map(|i| 1.0 + (i % 4) as f64).collect::<Vec<_>>());
        let kappa = array![[2.0f64.ln() + 0.5], [20.0f64.ln()]];
        let vmf = VonMisesFisher::new(mu, kappa).unwrap();
        let su = SphericalUniform::new(dim, vec![]).unwrap();
        let kl = kl_divergence(&vmf, &su).unwrap();
        assert_eq!(kl.shape(), &[2, 1]);
        let mc = monte_carlo_kl(&vmf, &su, 50_000, 7);
        for (a, b) in mc.iter().zip(kl.iter()) {
            assert!(*b > 0.0);
            assert_relative_eq!(*a, *b, max_relative = 0.1);
        }
    }
}

#[test]
fn vmf_to_vmf_matches_monte_carlo() {
    for dim in [2usize, 3, 6] {
        let p = VonMisesFisher::new(normalize(&vec![1.0; dim]), [0.5, 2.0, 8.0]).unwrap();
        let mut other = vec![0.0; dim];
        other[0] = 1.0;
        other[dim - 1] = 0.5;
        let q = VonMisesFisher::new(normalize(&other), 4.0).unwrap();
        let kl = kl_divergence(&p, &q).unwrap();
        let mc = monte_carlo_kl(&p, &q, 50_000, 11);
        for (a, b) in mc.iter().zip(kl.iter()) {
            assert_relative_eq!(*a, *b, max_relative = 0.05);
        }
    }
}

#[test]
fn chi2_matches_monte_carlo() {
    let p = Chi2::new([3.0, 10.0]).unwrap();
    let q = Chi2::new(5.0).unwrap();
    let kl = kl_divergence(&p, &q).unwrap();
    let mc = monte_carlo_kl(&p, &q, 50_000, 5);
    for (a, b) in mc.iter().zip(kl.iter()) {
        assert_relative_eq!(*a, *b, max_relative = 0.05);
    }
}

#[test]
fn self_divergence_is_zero() {
    let vmf = VonMisesFisher::new(normalize(&[3.0, -1.0, 2.0, 0.5]), [0.0, 0.7, 15.0]).unwrap();
    let su = SphericalUniform::new(4, vec![3]).unwrap();
    let chi2 = Chi2::new([0.5, 1.0, 9.0]).unwrap();
    let pairs: [(&dyn Distribution, &dyn Distribution); 3] = [(&vmf, &vmf), (&su, &su), (&chi2, &chi2)];
    for (a, b) in pairs {
        let kl = kl_divergence(a, b).unwrap();
        assert!(kl.iter().all(|v| v.abs() < 1e-4), "{}: {kl:?}", a.name());
    }
}
