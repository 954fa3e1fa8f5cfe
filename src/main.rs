
use pbhaplo::cli::{Settings, check_settings, get_raw_settings};
use pbhaplo::cluster_tally::SampleResult;
use pbhaplo::data_types::reference_sequence::{ReferenceError, ReferenceSequence};
use pbhaplo::haplotype_caller::HaplotypeConfig;
use pbhaplo::pbaa_parsing::get_pbaa_samples;
use pbhaplo::sample_processor::process_sample;
use pbhaplo::writers::cluster_writer::ClusterWriter;
use pbhaplo::writers::count_writer::CountWriter;

use log::{LevelFilter, debug, error, info, warn};
use std::sync::{Arc, mpsc};
use std::time::Instant;
use threadpool::ThreadPool;

fn main() {
    // get the settings
    let settings: Settings = get_raw_settings();
    let filter_level: LevelFilter = match settings.verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace
    };

    // immediately setup logging first
    env_logger::builder()
        .format_timestamp_millis()
        .filter_level(filter_level)
        .init();

    // okay, now we can check all the other settings
    let cli_settings: Settings = check_settings(settings);

    // load the reference and build the fixed configuration before touching any samples
    let reference: ReferenceSequence = match ReferenceSequence::from_fasta(&cli_settings.reference_filename) {
        Ok(r) => r,
        Err(e) => {
            error!("Error during reference loading: {}", e);
            match e {
                ReferenceError::Io { .. } => std::process::exit(exitcode::IOERR),
                ReferenceError::MalformedReference { .. } => std::process::exit(exitcode::DATAERR)
            };
        }
    };

    let config: HaplotypeConfig = match HaplotypeConfig::new(
        reference,
        cli_settings.snp_positions(),
        &cli_settings.haplotypes,
        cli_settings.scoring_policy()
    ) {
        Ok(c) => c,
        Err(e) => {
            error!("Error during configuration: {}", e);
            std::process::exit(exitcode::USAGE);
        }
    };
    let arc_config: Arc<HaplotypeConfig> = Arc::new(config);

    // figure out which samples are getting processed
    let sample_names: Vec<String> = if cli_settings.sample_names.is_empty() {
        match get_pbaa_samples(&cli_settings.pbaa_dir) {
            Ok(s) => s,
            Err(e) => {
                error!("Error while searching for samples in {:?}: {}", cli_settings.pbaa_dir, e);
                std::process::exit(exitcode::IOERR);
            }
        }
    } else {
        cli_settings.sample_names.clone()
    };
    if sample_names.is_empty() {
        warn!("No samples found in {:?}, output files will only contain headers.", cli_settings.pbaa_dir);
    } else {
        info!("Found {} samples to process.", sample_names.len());
    }

    let start_time: Instant = Instant::now();
    let mut results: Vec<Option<SampleResult>> = vec![None; sample_names.len()];
    let mut results_received: usize = 0;

    if cli_settings.threads <= 1 {
        for (sample_index, sample_name) in sample_names.iter().enumerate() {
            let sample_result = match process_sample(&arc_config, &cli_settings.pbaa_dir, &cli_settings.fastq_dir, sample_name) {
                Ok(r) => r,
                Err(e) => {
                    error!("Error while processing sample {:?}:", sample_name);
                    error!("  {}", e);
                    std::process::exit(exitcode::DATAERR);
                }
            };
            results_received += 1;
            log_sample_result(&sample_result, results_received, sample_names.len());
            results[sample_index] = Some(sample_result);
        }
    } else {
        info!("Starting job pool with {} threads...", cli_settings.threads);
        let pool = ThreadPool::new(cli_settings.threads);
        let (tx, rx) = mpsc::channel();

        for (sample_index, sample_name) in sample_names.iter().enumerate() {
            let tx = tx.clone();
            let arc_config = arc_config.clone();
            let pbaa_dir = cli_settings.pbaa_dir.clone();
            let fastq_dir = cli_settings.fastq_dir.clone();
            let sample_name = sample_name.clone();

            pool.execute(move|| {
                // dynamic errors cannot be sent via mpsc, so we convert them to strings here
                let sample_result = process_sample(&arc_config, &pbaa_dir, &fastq_dir, &sample_name)
                    .map_err(|e| format!("Error while processing sample {sample_name:?}: {e}"));
                tx.send((sample_index, sample_result)).expect("channel will be there waiting for the pool");
            });
        }
        // drop our copy so the receiver ends once every job is done
        std::mem::drop(tx);

        while results_received < sample_names.len() {
            if pool.panic_count() > 0 {
                error!("Panic detected in ThreadPool, check above for details.");
                std::process::exit(exitcode::SOFTWARE);
            }

            let (sample_index, sample_result) = match rx.recv() {
                Ok(r) => r,
                Err(e) => {
                    error!("Error while waiting for sample results: {}", e);
                    std::process::exit(exitcode::SOFTWARE);
                }
            };
            let sample_result = match sample_result {
                Ok(r) => r,
                Err(e) => {
                    error!("{}", e);
                    std::process::exit(exitcode::DATAERR);
                }
            };
            results_received += 1;
            log_sample_result(&sample_result, results_received, sample_names.len());
            results[sample_index] = Some(sample_result);
        }
    }

    info!("All samples tallied after {} seconds, writing output files...", start_time.elapsed().as_secs_f64());

    // nothing gets written until every sample is done, so a failure never leaves partial tables
    let clusters_filename = cli_settings.clusters_filename();
    let mut cluster_writer: ClusterWriter = match ClusterWriter::new(&clusters_filename) {
        Ok(w) => w,
        Err(e) => {
            error!("Error during cluster writer creation: {}", e);
            std::process::exit(exitcode::IOERR);
        }
    };
    let counts_filename = cli_settings.counts_filename();
    let mut count_writer: CountWriter = match CountWriter::new(&counts_filename, arc_config.vocabulary().haplotypes()) {
        Ok(w) => w,
        Err(e) => {
            error!("Error during count writer creation: {}", e);
            std::process::exit(exitcode::IOERR);
        }
    };

    for sample_result in results.iter().flatten() {
        match cluster_writer.write_assignments(&sample_result.assignments) {
            Ok(()) => {},
            Err(e) => {
                error!("Error while writing cluster file: {}", e);
                std::process::exit(exitcode::IOERR);
            }
        };
        match count_writer.write_tally(&sample_result.tally) {
            Ok(()) => {},
            Err(e) => {
                error!("Error while writing count file: {}", e);
                std::process::exit(exitcode::IOERR);
            }
        };
    }

    info!("Saved cluster assignments to {:?}.", clusters_filename);
    info!("Saved haplotype counts to {:?}.", counts_filename);
    info!("All samples finished successfully after {} seconds.", start_time.elapsed().as_secs_f64());
}

/// Sub-routine so the single and multi-threaded paths report identically
/// # Arguments
/// * `sample_result` - the finished sample
/// * `results_received` - number of samples finished so far, including this one
/// * `total_samples` - number of samples in the run
fn log_sample_result(sample_result: &SampleResult, results_received: usize, total_samples: usize) {
    let tally = &sample_result.tally;
    let assigned: usize = sample_result.assignments.iter()
        .filter(|a| a.haplotype.is_some())
        .count();
    info!("Finished sample {} ({} / {}): {} / {} clusters assigned, {} total reads, {} failed QC, {} failed haplotyping",
        tally.sample_name(), results_received, total_samples,
        assigned, sample_result.assignments.len(),
        tally.total_reads(), tally.failed_qc(), tally.failed_haplotyping()
    );
    debug!("{} haplotype counts: {:?}", tally.sample_name(), tally.haplotype_counts());
}
