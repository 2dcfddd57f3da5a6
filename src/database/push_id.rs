use std::sync::{LazyLock, Mutex};

use rand::Rng;

const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

struct PushState {
    last_millis: u64,
    last_rand: [u8; 12],
}

static PUSH_STATE: LazyLock<Mutex<PushState>> = LazyLock::new(|| {
    Mutex::new(PushState {
        last_millis: 0,
        last_rand: [0; 12],
    })
});

/// Generates a 20-character child key that sorts after every key generated
/// at an earlier timestamp, and after earlier keys within the same
/// millisecond.
pub(crate) fn next_push_id(mut now: u64) -> String {
    let mut state = PUSH_STATE.lock().unwrap();
    let same_millis = now == state.last_millis;
    state.last_millis = now;

    let mut prefix = [0u8; 8];
    for slot in prefix.iter_mut().rev() {
        *slot = PUSH_CHARS[(now % 64) as usize];
        now /= 64;
    }

    if same_millis {
        // Same-millisecond keys increment the previous random tail.
        let mut index = state.last_rand.len();
        while index > 0 && state.last_rand[index - 1] == 63 {
            state.last_rand[index - 1] = 0;
            index -= 1;
        }
        if index > 0 {
            state.last_rand[index - 1] += 1;
        }
    } else {
        let mut rng = rand::thread_rng();
        for slot in state.last_rand.iter_mut() {
            *slot = rng.gen_range(0..64);
        }
    }

    let mut id = String::with_capacity(20);
    id.extend(prefix.iter().map(|&byte| byte as char));
    id.extend(
        state
            .last_rand
            .iter()
            .map(|&index| PUSH_CHARS[index as usize] as char),
    );
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_twenty_characters() {
        assert_eq!(next_push_id(1_700_000_000_000).len(), 20);
    }

    #[test]
    fn keys_within_one_millisecond_stay_ordered_and_distinct() {
        let keys: Vec<String> = (0..16).map(|_| next_push_id(1_700_000_000_001)).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(keys, sorted);
    }
}
