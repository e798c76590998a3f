use std::collections::BTreeMap;

use rand::Rng;
use templine::Model;

pub fn generate_random_whitespace() -> String {
    let mut rng = rand::rng();
    let length = rng.random_range(0..10);
    (0..length).map(|_| ' ').collect()
}

pub fn generate_random_whitespace_at_least_one() -> String {
    let mut rng = rand::rng();
    let length = rng.random_range(1..10);
    (0..length).map(|_| ' ').collect()
}

/// A model with a user record and a couple of lists, shared by the
/// integration tests.
pub fn user_model() -> Model {
    let mut user = BTreeMap::new();
    user.insert("name".to_string(), Model::from("Ada"));
    user.insert("age".to_string(), Model::I32(36));
    user.insert("active".to_string(), Model::from(true));

    let mut root = BTreeMap::new();
    root.insert("user".to_string(), Model::Map(user));
    root.insert(
        "items".to_string(),
        Model::from(vec![Model::from("a"), Model::from("b")]),
    );
    root.insert("greet".to_string(), Model::from(true));
    Model::Map(root)
}

/// Inserts or replaces one top-level entry, returning the updated model.
pub fn with_entry(model: Model, key: &str, value: Model) -> Model {
    match model {
        Model::Map(mut entries) => {
            entries.insert(key.to_string(), value);
            Model::Map(entries)
        }
        other => other,
    }
}
