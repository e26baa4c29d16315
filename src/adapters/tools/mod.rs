//! External tool adapters (FastQC and fastp) driven as subprocesses.

pub mod fastp;
pub mod fastqc;
pub mod process;

pub use fastp::FastpTrimmer;
pub use fastqc::FastQcAnalyzer;
