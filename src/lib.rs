pub mod campaign;
pub mod catalog;
pub mod config;
pub mod credential;
pub mod engine;
pub mod export;
pub mod extract;
pub mod feedback;
pub mod hashtype;
pub mod io;
pub mod pot;
pub mod prompt;
pub mod ranking;
pub mod report;
pub mod stats;

pub mod prelude {
    pub use crate::campaign::{Campaign, Phase};
    pub use crate::config::{Config, Settings};
    pub use crate::credential::{CredentialStore, FileStore};
    pub use crate::engine::{CrackEngine, Hashcat};
    pub use crate::ranking::DictRanking;
}
