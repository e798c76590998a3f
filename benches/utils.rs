use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use templine::Model;

/// Generate n random models to use in the benchmark
pub fn generate_random_models(n: usize) -> Vec<Model> {
    let mut rng = StdRng::seed_from_u64(42); // Fixed seed for reproducibility
    let mut models = Vec::with_capacity(n);

    for _ in 0..n {
        let mut user = BTreeMap::new();
        user.insert(
            "name".to_string(),
            Model::from(random_string(&mut rng, 5, 10)),
        );
        user.insert("age".to_string(), Model::I64(rng.random_range(18..80)));
        user.insert("active".to_string(), Model::from(rng.random_bool(0.7)));

        let items_count = rng.random_range(3..10);
        let mut items = Vec::with_capacity(items_count);
        for _ in 0..items_count {
            let mut item = BTreeMap::new();
            item.insert(
                "name".to_string(),
                Model::from(random_string(&mut rng, 3, 8)),
            );
            item.insert("value".to_string(), Model::I64(rng.random_range(10..1000)));
            item.insert("special".to_string(), Model::from(rng.random_bool(0.3)));
            items.push(Model::Map(item));
        }

        let mut root = BTreeMap::new();
        root.insert("user".to_string(), Model::Map(user));
        root.insert("items".to_string(), Model::List(items));
        root.insert(
            "show_details".to_string(),
            Model::from(rng.random_bool(0.8)),
        );
        root.insert("has_access".to_string(), Model::from(rng.random_bool(0.6)));
        models.push(Model::Map(root));
    }

    models
}

/// Generate a random string with length between min and max
fn random_string(rng: &mut StdRng, min_len: usize, max_len: usize) -> String {
    let charset = "abcdefghijklmnopqrstuvwxyz";
    let len = rng.random_range(min_len..=max_len);

    (0..len)
        .map(|_| {
            let idx = rng.random_range(0..charset.len());
            charset.chars().nth(idx).unwrap()
        })
        .collect()
}

// Print binary size information - can be used from individual benchmarks
pub fn print_binary_size() {
    let binary_path = std::env::current_exe().unwrap();
    let metadata = std::fs::metadata(binary_path.clone()).unwrap();
    let size_bytes = metadata.len();
    let size_kb = size_bytes as f64 / 1024.0;
    let size_mb = size_kb / 1024.0;

    println!(
        "Binary size: {:.2} MB ({:.2} KB, {} bytes)",
        size_mb, size_kb, size_bytes
    );
    println!("Binary path: {}", binary_path.display());
}
