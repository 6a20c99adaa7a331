use crate::character::CharacterId;

/// State transitions reported by [`KinematicSystem::tick`](crate::system::KinematicSystem::tick),
/// in the order they happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CharacterEvent {
    /// Touched stable ground after being airborne.
    Landed(CharacterId),
    /// Vertical speed turned downward while airborne.
    BeganFalling(CharacterId),
}

impl CharacterEvent {
    #[inline]
    pub fn character(&self) -> CharacterId {
        match *self {
            CharacterEvent::Landed(id) | CharacterEvent::BeganFalling(id) => id,
        }
    }
}
