#![forbid(unsafe_code)]

//! Stack markers: `A`, `B`, ..., `Z`, `AA`, `AB`, ...
//!
//! Markers count in bijective base 26, so incrementing carries like an
//! odometer without a zero digit: `Z` becomes `AA`, `AZ` becomes `BA`, and
//! `ZZ` becomes `AAA`. Markers produced in sequence are strictly increasing
//! in (length, lexicographic) order.

/// The marker after `marker`. An empty marker is followed by `A`.
///
/// Characters outside `A..=Z` are treated as `A`.
#[must_use]
pub fn next_marker(marker: &str) -> String {
    let mut digits: Vec<u8> = marker
        .bytes()
        .map(|b| if b.is_ascii_uppercase() { b } else { b'A' })
        .collect();
    let mut carry = true;
    for digit in digits.iter_mut().rev() {
        if !carry {
            break;
        }
        if *digit == b'Z' {
            *digit = b'A';
        } else {
            *digit += 1;
            carry = false;
        }
    }
    if carry {
        digits.insert(0, b'A');
    }
    digits.into_iter().map(char::from).collect()
}

/// Marker for the stack at zero-based `index`.
#[must_use]
pub fn marker_for(index: usize) -> String {
    let mut n = index + 1;
    let mut digits = Vec::new();
    while n > 0 {
        n -= 1;
        digits.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    digits.into_iter().rev().map(char::from).collect()
}

/// Endless iterator of markers starting at `A`.
#[derive(Debug, Clone, Default)]
pub struct StackMarkers {
    last: Option<String>,
}

impl StackMarkers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Iterator for StackMarkers {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let next = next_marker(self.last.as_deref().unwrap_or(""));
        self.last = Some(next.clone());
        Some(next)
    }
}
