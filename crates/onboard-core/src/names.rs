//! Display names for simulated users

use rand::seq::SliceRandom;
use rand::Rng;

const FIRST_NAMES: &[&str] = &[
    "Ada", "Alan", "Barbara", "Claude", "Dorothy", "Edsger", "Frances", "Grace", "Hedy",
    "Ivan", "Joan", "John", "Katherine", "Leslie", "Margaret", "Niklaus", "Radia", "Robin",
    "Shafi", "Tim", "Vint", "Whitfield", "Yukihiro", "Zhores",
];

const LAST_NAMES: &[&str] = &[
    "Allen", "Babbage", "Cerf", "Diffie", "Dijkstra", "Goldwasser", "Hamilton", "Hopper",
    "Johnson", "Kay", "Lamport", "Liskov", "Lovelace", "Matsumoto", "Milner", "Perlman",
    "Ritchie", "Shannon", "Sutherland", "Thompson", "Turing", "Wirth",
];

/// Pick a random "First Last" name
pub fn full_name<R: Rng>(rng: &mut R) -> String {
    let first = FIRST_NAMES.choose(rng).copied().unwrap_or("Anonymous");
    let last = LAST_NAMES.choose(rng).copied().unwrap_or("User");
    format!("{} {}", first, last)
}
