//! Expands the BLAKE3 test vector fixture into a TrustInSoft analysis
//! matrix: one synthetic input file per vector, one expected-output file per
//! hash mode, and a `tis.config` entry for every (vector, case, machdep)
//! combination.

use anyhow::{ensure, Result};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

pub mod cli;


pub const NAME: &str = "tis-gen";

/// Default-length output, in bytes. The first `2 * OUT_LEN` characters of an
/// extended expected string are the default-length expectation.
pub const OUT_LEN: usize = 32;

/// Machdeps the hash program is analyzed under, in output order.
pub const MACHDEPS: &[&str] = &["gcc_x86_32", "gcc_x86_64", "ppc_32", "ppc_64"];

pub const BASE_CONFIG: &str = "trustinsoft/common.config";

pub const VECTORS_DIR: &str = "trustinsoft/test_vectors";

/// Logical name the analyzer mounts the synthetic input under.
pub const STDIN_FILE: &str = "tis-mkfs-stdin";

/// Logical name the analyzer mounts the expected output under.
pub const EXPECTED_FILE: &str = "expected";

/// Separator for `val-args`. The value is a single token that the analyzer
/// splits back into an argument list, so it leads with the separator too.
pub const ARG_SEPARATOR: char = '%';

/// Result comparison is skipped from this vector number on. Hashing the
/// longest inputs under the analyzer is too slow to check eagerly.
pub const NO_RESULTS_FROM: usize = 22;

// Paint the input with a repeating byte pattern. We use a cycle length of
// 251, because that's the largest prime number less than 256. This makes it
// unlikely that swapping any two adjacent input blocks or chunks will give
// the same answer.
pub fn paint_test_input(buf: &mut [u8]) {
    for (i, b) in buf.iter_mut().enumerate() {
        *b = (i % 251) as u8;
    }
}

/// Synthesize the input for a test vector. Pure: the contents depend on
/// `len` alone.
pub fn make_test_input(len: usize) -> Vec<u8> {
    let mut buf = vec![0; len];
    paint_test_input(&mut buf);
    buf
}

/// One abstract test vector from the fixture. The three expected strings are
/// extended (XOF) outputs in hex; truncations are prefixes, so the
/// default-length expectations are their first `2 * OUT_LEN` characters.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct TestVector {
    pub input_len: usize,
    pub hash: String,
    pub keyed_hash: String,
    pub derive_key: String,
}

/// The whole fixture. Read once at startup and passed by reference from
/// there on. Vector numbering is the 1-based position in `cases`.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Fixture {
    pub key: String,
    pub context_string: String,
    pub cases: Vec<TestVector>,
}

/// One hash-mode instantiation of a test vector: the expected output and the
/// arguments that make the program produce it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestCase {
    pub name: &'static str,
    pub expected: String,
    pub args: Vec<String>,
}

/// The six test cases of one vector, in output order. The `--length` value
/// is the byte count the program should emit, i.e. half the character count
/// of the extended hex string. Expects a vector that passed validation.
pub fn test_cases(fixture: &Fixture, vector: &TestVector) -> Vec<TestCase> {
    let hex_key = hex::encode(fixture.key.as_bytes());
    let length_arg = |xof: &str| (xof.len() / 2).to_string();
    vec![
        TestCase {
            name: "hash",
            expected: vector.hash[..2 * OUT_LEN].to_string(),
            args: vec![],
        },
        TestCase {
            name: "hash_xof",
            expected: vector.hash.clone(),
            args: vec!["--length".into(), length_arg(&vector.hash)],
        },
        TestCase {
            name: "keyed_hash",
            expected: vector.keyed_hash[..2 * OUT_LEN].to_string(),
            args: vec!["--keyed".into(), hex_key.clone()],
        },
        TestCase {
            name: "keyed_hash_xof",
            expected: vector.keyed_hash.clone(),
            args: vec![
                "--keyed".into(),
                hex_key,
                "--length".into(),
                length_arg(&vector.keyed_hash),
            ],
        },
        TestCase {
            name: "derive_key",
            expected: vector.derive_key[..2 * OUT_LEN].to_string(),
            args: vec!["--derive-key".into(), fixture.context_string.clone()],
        },
        TestCase {
            name: "derive_key_xof",
            expected: vector.derive_key.clone(),
            args: vec![
                "--derive-key".into(),
                fixture.context_string.clone(),
                "--length".into(),
                length_arg(&vector.derive_key),
            ],
        },
    ]
}

/// A file mounted into the analyzed filesystem, serialized under
/// `filesystem.files`.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct FileBinding {
    pub name: String,
    pub from: String,
}

/// One entry of the generated configuration: a single run of the hash
/// program under one machdep. Includes are natively multi-valued here; the
/// JSON duplicate-key workaround lives entirely in serialization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TisTest {
    pub name: String,
    pub includes: Vec<String>,
    pub machdep: String,
    pub files: Vec<FileBinding>,
    pub val_args: Option<String>,
    pub no_results: bool,
}

impl Serialize for TisTest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        #[derive(Serialize)]
        struct Filesystem<'a> {
            files: &'a [FileBinding],
        }

        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("name", &self.name)?;
        // A JSON object cannot carry the same key twice, so the second and
        // later includes get trailing underscores here and are rewritten
        // back to "include" in render_config.
        for (i, include) in self.includes.iter().enumerate() {
            let mut key = "include".to_string();
            for _ in 0..i {
                key.push('_');
            }
            map.serialize_entry(&key, include)?;
        }
        map.serialize_entry("machdep", &self.machdep)?;
        map.serialize_entry("filesystem", &Filesystem { files: &self.files })?;
        if let Some(args) = &self.val_args {
            map.serialize_entry("val-args", args)?;
        }
        if self.no_results {
            map.serialize_entry("no-results", &true)?;
        }
        map.end()
    }
}

/// A side-channel file for the downstream harness: the synthetic input of a
/// vector, or the expected output of one of its cases.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VectorFile {
    pub name: String,
    pub contents: Vec<u8>,
}

/// The full expansion of a fixture: the files to materialize and the
/// configuration entries, both in their final order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestMatrix {
    pub files: Vec<VectorFile>,
    pub entries: Vec<TisTest>,
}

/// Expansion policy. All fields have the fixed defaults the analysis setup
/// uses; the CLI can override each of them.
#[derive(Clone, Debug)]
pub struct Options {
    pub machdeps: Vec<String>,
    pub includes: Vec<String>,
    /// Path prefix of the vector files, as seen from the analysis root.
    pub vectors_dir: String,
    /// First vector number whose results are not compared, if any.
    pub no_results_from: Option<usize>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            machdeps: MACHDEPS.iter().map(|s| s.to_string()).collect(),
            includes: vec![BASE_CONFIG.to_string()],
            vectors_dir: VECTORS_DIR.to_string(),
            no_results_from: Some(NO_RESULTS_FROM),
        }
    }
}

/// File name of a vector's input or expected-output file, e.g. `01_input`.
pub fn vector_file(vector_no: usize, name: &str) -> String {
    format!("{:02}_{}", vector_no, name)
}

fn validate_vector(vector_no: usize, vector: &TestVector) -> Result<()> {
    let fields = [
        ("hash", &vector.hash),
        ("keyed_hash", &vector.keyed_hash),
        ("derive_key", &vector.derive_key),
    ];
    for (field, value) in fields {
        ensure!(
            value.len() >= 2 * OUT_LEN,
            "vector {:02}: {} is shorter than {} hex characters",
            vector_no,
            field,
            2 * OUT_LEN,
        );
        ensure!(
            value.len() % 2 == 0,
            "vector {:02}: {} has an odd number of hex characters",
            vector_no,
            field,
        );
        ensure!(
            value.bytes().all(|b| b.is_ascii_hexdigit()),
            "vector {:02}: {} is not a hex string",
            vector_no,
            field,
        );
    }
    Ok(())
}

fn make_entry(vector_no: usize, case: &TestCase, machdep: &str, opts: &Options) -> TisTest {
    let val_args = if case.args.is_empty() {
        None
    } else {
        let mut joined = String::new();
        for arg in &case.args {
            joined.push(ARG_SEPARATOR);
            joined.push_str(arg);
        }
        Some(joined)
    };
    TisTest {
        name: format!("Test vector {:02}: {} ({})", vector_no, case.name, machdep),
        includes: opts.includes.clone(),
        machdep: machdep.to_string(),
        files: vec![
            FileBinding {
                name: STDIN_FILE.to_string(),
                from: format!("{}/{}", opts.vectors_dir, vector_file(vector_no, "input")),
            },
            FileBinding {
                name: EXPECTED_FILE.to_string(),
                from: format!(
                    "{}/{}",
                    opts.vectors_dir,
                    vector_file(vector_no, &format!("expected_{}", case.name)),
                ),
            },
        ],
        val_args,
        no_results: opts
            .no_results_from
            .map_or(false, |from| vector_no >= from),
    }
}

/// Expand a fixture into the full test matrix. Every vector yields one input
/// file, six expected-output files, and `6 * machdeps.len()` configuration
/// entries, in vector-major, case-next, machdep-minor order. Fails on the
/// first malformed vector; performs no I/O.
pub fn expand(fixture: &Fixture, opts: &Options) -> Result<TestMatrix> {
    let mut files = Vec::new();
    let mut entries = Vec::new();
    for (index, vector) in fixture.cases.iter().enumerate() {
        let vector_no = index + 1;
        validate_vector(vector_no, vector)?;
        files.push(VectorFile {
            name: vector_file(vector_no, "input"),
            contents: make_test_input(vector.input_len),
        });
        for case in test_cases(fixture, vector) {
            files.push(VectorFile {
                name: vector_file(vector_no, &format!("expected_{}", case.name)),
                contents: case.expected.clone().into_bytes(),
            });
            for machdep in &opts.machdeps {
                entries.push(make_entry(vector_no, &case, machdep, opts));
            }
        }
    }
    Ok(TestMatrix { files, entries })
}

// Rewrite the synthetic "include_", "include__", ... keys back to "include".
// Only keys are touched: the underscores must run right up to the closing
// quote, which is never the case for a path value like "include_x".
fn rewrite_include_keys(json: &str) -> String {
    const KEY: &str = "\"include";
    let mut out = String::with_capacity(json.len());
    let mut rest = json;
    while let Some(pos) = rest.find("\"include_") {
        let after = rest[pos + KEY.len()..].trim_start_matches('_');
        if after.starts_with('"') {
            out.push_str(&rest[..pos]);
            out.push_str(KEY);
            rest = after;
        } else {
            out.push_str(&rest[..pos + KEY.len()]);
            rest = &rest[pos + KEY.len()..];
        }
    }
    out.push_str(rest);
    out
}

/// Render the configuration entries as pretty-printed JSON with 4-space
/// indentation, with every include directive under the shared `include` key.
pub fn render_config(entries: &[TisTest]) -> serde_json::Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    entries.serialize(&mut ser)?;
    let json = String::from_utf8(buf).expect("serde_json writes UTF-8");
    Ok(rewrite_include_keys(&json))
}
