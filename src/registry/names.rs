//! Random room IDs and display names

use rand::seq::IndexedRandom;
use rand::Rng;

use crate::id::RoomId;

/// Lowercase alphanumerics without look-alikes (0/o, 1/l)
const ROOM_ID_ALPHABET: &[u8] = b"abcdefghijkmnpqrstuvwxyz23456789";

/// 22 symbols of 5 bits each, 110 bits of entropy
const ROOM_ID_LEN: usize = 22;

const ADJECTIVES: &[&str] = &[
    "Able", "Bold", "Brave", "Bright", "Calm", "Clever", "Cosmic", "Curious", "Eager", "Fancy",
    "Gentle", "Happy", "Jolly", "Kind", "Lively", "Lucky", "Mighty", "Nimble", "Polite", "Proud",
    "Quick", "Quiet", "Rapid", "Shiny", "Silly", "Sunny", "Swift", "Witty", "Zany", "Zesty",
];

const NOUNS: &[&str] = &[
    "Badger", "Beaver", "Falcon", "Ferret", "Fox", "Gecko", "Heron", "Ibis", "Koala", "Lemur",
    "Lynx", "Marten", "Moose", "Newt", "Otter", "Owl", "Panda", "Pelican", "Puffin", "Quokka",
    "Raven", "Robin", "Seal", "Sloth", "Stoat", "Tapir", "Toucan", "Walrus", "Wombat", "Yak",
];

/// Generate an unguessable room ID
pub fn generate_room_id() -> RoomId {
    let mut rng = rand::rng();
    let id: String = (0..ROOM_ID_LEN)
        .map(|_| ROOM_ID_ALPHABET[rng.random_range(0..ROOM_ID_ALPHABET.len())] as char)
        .collect();
    RoomId(id)
}

/// Generate a readable anonymous display name, e.g. "Swift Otter"
pub fn random_user_name() -> String {
    let mut rng = rand::rng();
    let adjective = ADJECTIVES.choose(&mut rng).copied().unwrap_or("Anonymous");
    let noun = NOUNS.choose(&mut rng).copied().unwrap_or("User");
    format!("{} {}", adjective, noun)
}
