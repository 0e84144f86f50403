mod runner;

pub use runner::{ResearchError, ResearchOutcome, ResearchProgress, ResearchRunner};
