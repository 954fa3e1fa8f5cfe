
use clap::Parser;
use lazy_static::lazy_static;
use log::{error, info, warn};
use std::path::{Path, PathBuf};

use crate::sequence_alignment::ScoringPolicy;

lazy_static! {
    /// Stores the full version string we plan to use.
    /// # Examples
    /// * `0.3.0-6bb9635-dirty` - while on a dirty branch
    /// * `0.3.0-6bb9635` - with a fresh commit
    pub static ref FULL_VERSION: String = format!("{}-{}", env!("CARGO_PKG_VERSION"), env!("VERGEN_GIT_DESCRIBE"));
}

#[derive(Clone, Parser)]
#[clap(
    version = &**FULL_VERSION,
    about,
    after_help = "This program comes with ABSOLUTELY NO WARRANTY; it is intended for
Research Use Only and not for use in diagnostic procedures.")]
pub struct Settings {
    /// Amplicon reference FASTA file
    #[clap(required = true)]
    #[clap(short = 'r')]
    #[clap(long = "reference")]
    #[clap(value_name = "FASTA")]
    #[clap(help_heading = Some("Input/Output"))]
    pub reference_filename: PathBuf,

    /// pbaa results folder, one sub-folder per sample
    #[clap(required = true)]
    #[clap(short = 'p')]
    #[clap(long = "pbaa-dir")]
    #[clap(value_name = "DIR")]
    #[clap(help_heading = Some("Input/Output"))]
    pub pbaa_dir: PathBuf,

    /// Folder containing <sample>.fastq.fai files
    #[clap(required = true)]
    #[clap(short = 'f')]
    #[clap(long = "fastq-dir")]
    #[clap(value_name = "DIR")]
    #[clap(help_heading = Some("Input/Output"))]
    pub fastq_dir: PathBuf,

    /// Output folder for the haplotype tables
    #[clap(short = 'o')]
    #[clap(long = "output-dir")]
    #[clap(value_name = "DIR")]
    #[clap(default_value = ".")]
    #[clap(help_heading = Some("Input/Output"))]
    pub output_dir: PathBuf,

    /// Gene label used to name the output files
    #[clap(required = true)]
    #[clap(short = 'g')]
    #[clap(long = "gene")]
    #[clap(value_name = "GENE")]
    #[clap(help_heading = Some("Input/Output"))]
    pub gene: String,

    /// Sample name to process (default: every sub-folder of --pbaa-dir)
    #[clap(short = 's')]
    #[clap(long = "sample")]
    #[clap(value_name = "SAMPLE")]
    #[clap(help_heading = Some("Input/Output"))]
    pub sample_names: Vec<String>,

    /// Haplotype code to report, one allele per SNP; order sets the output columns
    #[clap(required = true)]
    #[clap(long = "haplotype")]
    #[clap(value_name = "CODE")]
    #[clap(help_heading = Some("Haplotypes"))]
    pub haplotypes: Vec<String>,

    /// 0-based reference coordinate of the first SNP
    #[clap(required = true)]
    #[clap(long = "snp-1")]
    #[clap(value_name = "POS")]
    #[clap(help_heading = Some("Haplotypes"))]
    pub snp_1: usize,

    /// 0-based reference coordinate of the second SNP
    #[clap(required = true)]
    #[clap(long = "snp-2")]
    #[clap(value_name = "POS")]
    #[clap(help_heading = Some("Haplotypes"))]
    pub snp_2: usize,

    /// Score for a matching base, in tenths
    #[clap(long = "match-score")]
    #[clap(value_name = "SCORE")]
    #[clap(default_value = "10")]
    #[clap(help_heading = Some("Alignment"))]
    pub match_score: i32,

    /// Score for a mismatching base, in tenths
    #[clap(long = "mismatch-score")]
    #[clap(value_name = "SCORE")]
    #[clap(default_value = "9")]
    #[clap(allow_negative_numbers = true)]
    #[clap(help_heading = Some("Alignment"))]
    pub mismatch_score: i32,

    /// Score for opening a gap, in tenths
    #[clap(long = "gap-open")]
    #[clap(value_name = "SCORE")]
    #[clap(default_value = "0")]
    #[clap(allow_negative_numbers = true)]
    #[clap(help_heading = Some("Alignment"))]
    pub gap_open: i32,

    /// Score for each gap position, in tenths
    #[clap(long = "gap-extend")]
    #[clap(value_name = "SCORE")]
    #[clap(default_value = "0")]
    #[clap(allow_negative_numbers = true)]
    #[clap(help_heading = Some("Alignment"))]
    pub gap_extend: i32,

    /// Number of samples to process in parallel
    #[clap(short = 't')]
    #[clap(long = "threads")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "1")]
    pub threads: usize,

    /// Enable verbose output
    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

/// Checks if a path exists and will otherwise exit
/// # Arguments
/// * `filename` - the path to check for
/// * `label` - the label to use for error messages
fn check_required_filename(filename: &Path, label: &str) {
    if !filename.exists() {
        error!("{} does not exist: \"{}\"", label, filename.display());
        std::process::exit(exitcode::NOINPUT);
    } else {
        info!("{}: \"{}\"", label, filename.display());
    }
}

impl Settings {
    /// Wrapper function to build the alignment scoring from our CLI settings
    pub fn scoring_policy(&self) -> ScoringPolicy {
        ScoringPolicy {
            match_score: self.match_score,
            mismatch_score: self.mismatch_score,
            gap_open: self.gap_open,
            gap_extend: self.gap_extend
        }
    }

    /// The SNP coordinates in haplotype code order
    pub fn snp_positions(&self) -> [usize; 2] {
        [self.snp_1, self.snp_2]
    }

    /// Path for the table of cluster assignments
    pub fn clusters_filename(&self) -> PathBuf {
        self.output_dir.join(format!("{}.clusters_by_haplotype.csv", self.gene))
    }

    /// Path for the per-sample count table
    pub fn counts_filename(&self) -> PathBuf {
        self.output_dir.join(format!("{}.haplotype_counts.csv", self.gene))
    }
}

pub fn get_raw_settings() -> Settings {
    Settings::parse()
}

/// Do some additional checks here, we may increase these as we go.
/// Also can modify settings if needed since we're passing it around.
/// # Arguments
/// * `settings` - the raw settings, nothing has been checked other than what clap does for us.
pub fn check_settings(mut settings: Settings) -> Settings {
    //check for any of our required files
    check_required_filename(&settings.reference_filename, "Reference file");
    check_required_filename(&settings.pbaa_dir, "pbaa folder");
    check_required_filename(&settings.fastq_dir, "FASTQ index folder");
    check_required_filename(&settings.output_dir, "Output folder");

    if settings.gene.is_empty() {
        error!("--gene must not be empty");
        std::process::exit(exitcode::USAGE);
    }

    // 0 doesn't make sense, so lets just error proof it up to 1
    if settings.threads == 0 {
        settings.threads = 1;
    }

    // dump stuff to the logger
    info!("Haplotypes:");
    info!("\tCodes: {:?}", settings.haplotypes);
    info!("\tSNP positions (0-based): {}, {}", settings.snp_1, settings.snp_2);
    if settings.snp_1 == settings.snp_2 {
        warn!("\tBoth SNP positions are identical ({})", settings.snp_1);
    }

    info!("Alignment scoring (tenths):");
    info!("\tMatch: {}", settings.match_score);
    info!("\tMismatch: {}", settings.mismatch_score);
    info!("\tGap open: {}", settings.gap_open);
    info!("\tGap extend: {}", settings.gap_extend);
    if settings.mismatch_score <= 0 {
        warn!("\tNon-positive mismatch scores make orientation selection sensitive to individual mismatches");
    }

    if settings.sample_names.is_empty() {
        info!("Samples: all");
    } else {
        info!("Samples: {:?}", settings.sample_names);
    }
    info!("Processing threads: {}", settings.threads);
    info!("Cluster output: \"{}\"", settings.clusters_filename().display());
    info!("Count output: \"{}\"", settings.counts_filename().display());

    //send the settings back
    settings
}
