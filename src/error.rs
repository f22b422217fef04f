use derive_more::{Display, From};

pub type Result<T> = core::result::Result<T, MarchingCubesError>;

#[derive(Debug, Display, From)]
#[display("{self:?}")]
pub enum MarchingCubesError {
    /// Control block or configuration rejected before any cell work.
    #[from(ignore)]
    InvalidConfiguration { reason: &'static str },
    /// A claim on the vertex buffer did not fit in the remaining capacity.
    #[from(ignore)]
    CapacityExceeded {
        requested: usize,
        available: usize,
        capacity: usize,
    },
    #[from(ignore)]
    InvalidIndex,
    Io(std::io::Error),
}

impl std::error::Error for MarchingCubesError {}
