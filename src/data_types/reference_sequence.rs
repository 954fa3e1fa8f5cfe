
use bio::io::fasta;
use flate2::bufread::MultiGzDecoder;
use log::{debug, info, warn};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum ReferenceError {
    #[error("failed to open reference {path:?}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("malformed reference {path:?}: {reason}")]
    MalformedReference { path: PathBuf, reason: String }
}

/// Wrapper structure for the single amplicon reference sequence
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReferenceSequence {
    /// The record ID from the header line
    name: String,
    /// Upper-case ASCII sequence, 0-based
    sequence: Vec<u8>
}

impl ReferenceSequence {
    /// Creates a reference directly from a name and sequence, mostly for testing.
    /// The sequence is upper-cased.
    pub fn new(name: &str, sequence: &[u8]) -> ReferenceSequence {
        ReferenceSequence {
            name: name.to_string(),
            sequence: sequence.to_ascii_uppercase()
        }
    }

    /// Loads the reference from a FASTA file.
    /// Only the first record is used, all sequence lines of that record are concatenated.
    /// # Arguments
    /// * `fasta_fn` - the FASTA filename, gzip is allowed
    /// # Errors
    /// * if the file cannot be opened
    /// * if the file is empty, has no header line, or the first record has no sequence
    pub fn from_fasta(fasta_fn: &Path) -> Result<ReferenceSequence, ReferenceError> {
        info!("Loading {:?}...", fasta_fn);
        let fasta_file: std::fs::File = std::fs::File::open(fasta_fn)
            .map_err(|source| ReferenceError::Io { path: fasta_fn.to_path_buf(), source })?;
        let file_reader = BufReader::new(fasta_file);
        let fasta_reader: fasta::Reader<Box<dyn BufRead>> = if fasta_fn.extension().unwrap_or_default() == "gz" {
            debug!("Detected gzip extension, loading reference with MultiGzDecoder...");
            let gz_decoder = MultiGzDecoder::new(file_reader);
            let bufreader = BufReader::new(gz_decoder);
            fasta::Reader::from_bufread(Box::new(bufreader))
        } else {
            debug!("Loading reference as plain-text file...");
            fasta::Reader::from_bufread(Box::new(file_reader))
        };

        let malformed = |reason: String| ReferenceError::MalformedReference {
            path: fasta_fn.to_path_buf(),
            reason
        };

        let mut records = fasta_reader.records();
        let record: fasta::Record = match records.next() {
            Some(Ok(r)) => r,
            Some(Err(e)) => return Err(malformed(e.to_string())),
            None => return Err(malformed("file is empty".to_string()))
        };

        let sequence: Vec<u8> = record.seq().to_ascii_uppercase();
        if sequence.is_empty() {
            return Err(malformed(format!("record {:?} has no sequence lines", record.id())));
        }

        let extra_records = records.count();
        if extra_records > 0 {
            warn!("Reference {:?} contains {} additional records, only {:?} will be used", fasta_fn, extra_records, record.id());
        }
        info!("Finished loading reference {:?} ({} bp).", record.id(), sequence.len());

        Ok(ReferenceSequence {
            name: record.id().to_string(),
            sequence
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sequence(&self) -> &[u8] {
        &self.sequence
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}
