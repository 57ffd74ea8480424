use rand::{Rng, SeedableRng, rngs::StdRng};
use serde_json::{Value, json};

/// `n` profile contexts for `template_profile.hbs`, identical on every run.
pub fn generate_random_contexts(n: usize) -> Vec<Value> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..n).map(|_| random_profile(&mut rng)).collect()
}

fn random_profile(rng: &mut StdRng) -> Value {
    let item_count = rng.random_range(3..10);
    let items: Vec<Value> = (0..item_count).map(|_| random_item(rng)).collect();

    json!({
        "user": {
            "name": random_word(rng, 5, 10),
            "age": rng.random_range(18..80),
            "active": rng.random_bool(0.7),
            // Exercises every escaped character.
            "bio": "<likes> \"quotes\" & 'ampersands'"
        },
        "items": items,
        "show_details": rng.random_bool(0.8),
        "has_access": rng.random_bool(0.6),
    })
}

fn random_item(rng: &mut StdRng) -> Value {
    json!({
        "name": random_word(rng, 3, 8),
        "value": rng.random_range(10..1000),
        "special": rng.random_bool(0.3)
    })
}

fn random_word(rng: &mut StdRng, min_len: usize, max_len: usize) -> String {
    let len = rng.random_range(min_len..=max_len);
    (0..len)
        .map(|_| char::from(rng.random_range(b'a'..=b'z')))
        .collect()
}

/// Prints the size of the running bench binary.
pub fn print_binary_size() {
    let binary_path = std::env::current_exe().unwrap();
    let size_bytes = std::fs::metadata(&binary_path).unwrap().len();
    let size_kb = size_bytes as f64 / 1024.0;

    println!(
        "Binary size: {:.2} MB ({:.2} KB, {} bytes) at {}",
        size_kb / 1024.0,
        size_kb,
        size_bytes,
        binary_path.display()
    );
}
