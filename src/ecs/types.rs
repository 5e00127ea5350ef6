//! Identifiers, limits and the component-presence bitmask.

use std::fmt;
use std::ops::{BitAnd, BitOr};

/// Recyclable entity identifier in `[0, MAX_ENTITIES)`.
pub type Entity = u32;

/// Id handed to a component type at registration; doubles as its signature bit.
pub type ComponentType = u32;

/// Maximum number of simultaneously living entities.
pub const MAX_ENTITIES: Entity = 10_000;

/// Maximum number of registered component types.
pub const MAX_COMPONENTS: ComponentType = 1_000;

const WORD_BITS: usize = 64;
const SIGNATURE_WORDS: usize = (MAX_COMPONENTS as usize + WORD_BITS - 1) / WORD_BITS;

/// Fixed-width bitset with one bit per registered component type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Signature {
    words: [u64; SIGNATURE_WORDS],
}

impl Signature {
    pub const EMPTY: Signature = Signature {
        words: [0; SIGNATURE_WORDS],
    };

    pub fn new() -> Self {
        Self::EMPTY
    }

    /// Set or clear the bit for `component`. Bits past `MAX_COMPONENTS` are ignored.
    pub fn set(&mut self, component: ComponentType, value: bool) {
        if component >= MAX_COMPONENTS {
            return;
        }
        let (word, mask) = Self::locate(component);
        if value {
            self.words[word] |= mask;
        } else {
            self.words[word] &= !mask;
        }
    }

    pub fn with(mut self, component: ComponentType) -> Self {
        self.set(component, true);
        self
    }

    pub fn test(&self, component: ComponentType) -> bool {
        if component >= MAX_COMPONENTS {
            return false;
        }
        let (word, mask) = Self::locate(component);
        self.words[word] & mask != 0
    }

    pub fn reset(&mut self) {
        self.words = [0; SIGNATURE_WORDS];
    }

    /// `true` when every bit of `required` is also set here.
    pub fn contains_all(&self, required: &Signature) -> bool {
        (*self & *required) == *required
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|word| *word == 0)
    }

    pub fn count(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// Set bits in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = ComponentType> + '_ {
        self.words.iter().enumerate().flat_map(|(index, word)| {
            let base = (index * WORD_BITS) as ComponentType;
            (0..WORD_BITS as ComponentType)
                .filter(move |bit| word & (1u64 << bit) != 0)
                .map(move |bit| base + bit)
        })
    }

    fn locate(component: ComponentType) -> (usize, u64) {
        let index = component as usize;
        (index / WORD_BITS, 1u64 << (index % WORD_BITS))
    }
}

impl BitAnd for Signature {
    type Output = Signature;

    fn bitand(mut self, rhs: Signature) -> Signature {
        for (lhs, rhs) in self.words.iter_mut().zip(rhs.words) {
            *lhs &= rhs;
        }
        self
    }
}

impl BitOr for Signature {
    type Output = Signature;

    fn bitor(mut self, rhs: Signature) -> Signature {
        for (lhs, rhs) in self.words.iter_mut().zip(rhs.words) {
            *lhs |= rhs;
        }
        self
    }
}

impl FromIterator<ComponentType> for Signature {
    fn from_iter<I: IntoIterator<Item = ComponentType>>(iter: I) -> Self {
        let mut signature = Signature::new();
        for component in iter {
            signature.set(component, true);
        }
        signature
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
