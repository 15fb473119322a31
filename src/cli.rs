use clap::{Parser, ValueHint};
use std::path::PathBuf;

/// Generate the TrustInSoft analysis configuration for the BLAKE3 test
/// vectors.
///
/// Reads the test vector fixture, writes one synthetic input file and six
/// expected-output files per vector, and emits a configuration entry for
/// every (vector, case, machdep) combination.
#[derive(Parser)]
#[command(version, max_term_width(100))]
pub struct Args {
    /// The test vector fixture to expand
    #[arg(
        value_hint(ValueHint::FilePath),
        default_value = "test_vectors/test_vectors.json"
    )]
    pub fixture: PathBuf,

    /// Directory the input and expected-output files are written to
    ///
    /// The same path refers to the files from inside the generated
    /// configuration, so it should be relative to the analysis root.
    #[arg(long, value_name("DIR"), default_value = crate::VECTORS_DIR)]
    pub vectors_dir: String,

    /// Path of the generated configuration
    #[arg(short, long, value_name("FILE"), default_value = "tis.config")]
    pub output: PathBuf,

    /// Analyze under this machdep only (may be repeated)
    ///
    /// Defaults to gcc_x86_32, gcc_x86_64, ppc_32, and ppc_64.
    #[arg(long, value_name("NAME"))]
    pub machdep: Vec<String>,

    /// Base configuration included by every entry (may be repeated)
    #[arg(long, value_name("FILE"))]
    pub include: Vec<String>,

    /// First vector number whose results are not compared
    ///
    /// Hashing the longest inputs under the analyzer is too slow to check
    /// eagerly, so result comparison is disabled from this vector on.
    #[arg(long, value_name("N"), default_value_t = crate::NO_RESULTS_FROM)]
    pub no_results_from: usize,

    /// Print every written file and generated entry name
    #[arg(short, long)]
    pub verbose: bool,
}
