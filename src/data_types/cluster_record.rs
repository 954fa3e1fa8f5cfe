
/// Label key preceding the number of reads in a cluster
const READ_COUNT_KEY: &str = "ReadCount-";
/// Label key preceding the cluster identifier
const CLUSTER_KEY: &str = "cluster-";
/// Label key preceding the cluster frequency
const FREQUENCY_KEY: &str = "cluster_freq:";
/// If this is absent from the label, the cluster was flagged by the chimera check
const NON_CHIMERIC_TAG: &str = "uchime_score:-1";

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ClusterParseError {
    #[error("missing {field:?} in cluster label {label:?}")]
    MissingField { field: &'static str, label: String },
    #[error("invalid {field:?} value {value:?} in cluster label {label:?}")]
    InvalidValue { field: &'static str, value: String, label: String },
    #[error("cluster frequency {frequency} is outside [0, 1] in cluster label {label:?}")]
    FrequencyRange { frequency: f64, label: String }
}

/// The structured fields pulled out of a pbaa cluster label, e.g.
/// `sample_guide-gene_cluster-0_ReadCount-130 uchime_score:-1 cluster_freq:0.46`
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterLabel {
    /// The cluster number assigned by pbaa
    pub cluster_id: String,
    /// The number of reads collapsed into the cluster
    pub read_count: u64,
    /// Fraction of the sample reads in this cluster
    pub cluster_frequency: f64,
    /// True if the chimera check did not clear the cluster
    pub possibly_chimeric: bool
}

impl ClusterLabel {
    /// Parses a full cluster label (FASTA ID and description).
    /// For each field, the first occurrence with a well-formed value is used.
    /// # Arguments
    /// * `label` - the header line without the leading `>`
    /// # Errors
    /// * if any of the read count, cluster ID, or frequency are missing
    /// * if the read count does not fit in a u64 or the frequency is outside [0, 1]
    pub fn parse(label: &str) -> Result<ClusterLabel, ClusterParseError> {
        let missing = |field: &'static str| ClusterParseError::MissingField { field, label: label.to_string() };

        let read_count_str = extract_after(label, READ_COUNT_KEY, digit_run)
            .ok_or_else(|| missing("ReadCount"))?;
        let read_count: u64 = read_count_str.parse()
            .map_err(|_| ClusterParseError::InvalidValue {
                field: "ReadCount",
                value: read_count_str.to_string(),
                label: label.to_string()
            })?;

        let cluster_id = extract_after(label, CLUSTER_KEY, digit_run)
            .ok_or_else(|| missing("cluster"))?
            .to_string();

        let frequency_str = extract_after(label, FREQUENCY_KEY, decimal_run)
            .ok_or_else(|| missing("cluster_freq"))?;
        let cluster_frequency: f64 = frequency_str.parse()
            .map_err(|_| ClusterParseError::InvalidValue {
                field: "cluster_freq",
                value: frequency_str.to_string(),
                label: label.to_string()
            })?;
        if !(0.0..=1.0).contains(&cluster_frequency) {
            return Err(ClusterParseError::FrequencyRange { frequency: cluster_frequency, label: label.to_string() });
        }

        Ok(ClusterLabel {
            cluster_id,
            read_count,
            cluster_frequency,
            possibly_chimeric: !label.contains(NON_CHIMERIC_TAG)
        })
    }
}

/// Returns the value following the first occurrence of `key` for which `value_len` finds a non-empty value.
fn extract_after<'a>(label: &'a str, key: &str, value_len: fn(&str) -> usize) -> Option<&'a str> {
    label.match_indices(key).find_map(|(index, _)| {
        let remainder = &label[index + key.len()..];
        match value_len(remainder) {
            0 => None,
            l => Some(&remainder[..l])
        }
    })
}

/// Length of the leading run of ASCII digits
fn digit_run(s: &str) -> usize {
    s.bytes().take_while(u8::is_ascii_digit).count()
}

/// Length of a leading `digits.digits` value, or 0 if there is none
fn decimal_run(s: &str) -> usize {
    let int_len = digit_run(s);
    if int_len == 0 || !s[int_len..].starts_with('.') {
        return 0;
    }
    match digit_run(&s[int_len+1..]) {
        0 => 0,
        frac_len => int_len + 1 + frac_len
    }
}

/// A single pbaa cluster from one sample, ready for haplotype calling
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterRecord {
    /// The sample the cluster came from
    pub sample_name: String,
    /// The cluster number from the label
    pub cluster_id: String,
    /// Consensus sequence of the cluster
    pub sequence: Vec<u8>,
    /// Number of reads in the cluster
    pub read_count: u64,
    /// Fraction of the sample reads in the cluster
    pub cluster_frequency: f64,
    /// Chimera flag from the label, informational only
    pub possibly_chimeric: bool,
    /// False if pbaa placed the cluster in the failed set
    pub passed_filter: bool
}

impl ClusterRecord {
    /// Builds a record from a raw label and sequence.
    /// # Arguments
    /// * `sample_name` - the sample this cluster belongs to
    /// * `label` - the full FASTA header (ID and description)
    /// * `sequence` - the consensus sequence
    /// * `passed_filter` - true if this came from the passed cluster set
    /// # Errors
    /// * if the label cannot be parsed
    pub fn from_label(sample_name: &str, label: &str, sequence: &[u8], passed_filter: bool) -> Result<ClusterRecord, ClusterParseError> {
        let cluster_label = ClusterLabel::parse(label)?;
        Ok(ClusterRecord {
            sample_name: sample_name.to_string(),
            cluster_id: cluster_label.cluster_id,
            sequence: sequence.to_vec(),
            read_count: cluster_label.read_count,
            cluster_frequency: cluster_label.cluster_frequency,
            possibly_chimeric: cluster_label.possibly_chimeric,
            passed_filter
        })
    }
}

/// All clusters pbaa reported for one sample, split by filter status
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleClusters {
    /// Clusters from the passed set, in file order
    pub passed: Vec<ClusterRecord>,
    /// Clusters from the failed set, in file order
    pub failed: Vec<ClusterRecord>
}

impl SampleClusters {
    /// Iterates over passed clusters first, then failed clusters
    pub fn iter(&self) -> impl Iterator<Item = &ClusterRecord> {
        self.passed.iter().chain(self.failed.iter())
    }

    pub fn len(&self) -> usize {
        self.passed.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passed.is_empty() && self.failed.is_empty()
    }

    /// Sum of read counts across both sets
    pub fn total_read_count(&self) -> u64 {
        self.iter().map(|c| c.read_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_label() {
        let label = "sample1_guide-HLA_cluster-3_ReadCount-130 uchime_score:-1 uchime_left:None uchime_right:None cluster_freq:0.4626334519572954 diversity:0.0";
        let parsed = ClusterLabel::parse(label).unwrap();
        assert_eq!(parsed, ClusterLabel {
            cluster_id: "3".to_string(),
            read_count: 130,
            cluster_frequency: 0.4626334519572954,
            possibly_chimeric: false
        });
    }

    #[test]
    fn test_parse_chimeric_label() {
        let label = "s1_cluster-12_ReadCount-7 uchime_score:0.52 cluster_freq:0.01";
        let parsed = ClusterLabel::parse(label).unwrap();
        assert_eq!(parsed.cluster_id, "12");
        assert_eq!(parsed.read_count, 7);
        assert!(parsed.possibly_chimeric);
    }

    #[test]
    fn test_first_well_formed_occurrence() {
        // the first "cluster-" has no digits after it, so the second one is used
        let label = "cluster-x_cluster-5_ReadCount-10 cluster_freq:1.0";
        assert_eq!(ClusterLabel::parse(label).unwrap().cluster_id, "5");

        // frequency requires a decimal point
        let label = "cluster-5_ReadCount-10 cluster_freq:1 cluster_freq:0.25";
        assert_eq!(ClusterLabel::parse(label).unwrap().cluster_frequency, 0.25);
    }

    #[test]
    fn test_missing_fields() {
        let label = "cluster-1 cluster_freq:0.5";
        assert_eq!(ClusterLabel::parse(label), Err(ClusterParseError::MissingField {
            field: "ReadCount", label: label.to_string()
        }));

        let label = "ReadCount-10 cluster_freq:0.5";
        assert_eq!(ClusterLabel::parse(label), Err(ClusterParseError::MissingField {
            field: "cluster", label: label.to_string()
        }));

        let label = "cluster-1_ReadCount-10 cluster_freq:NaN";
        assert_eq!(ClusterLabel::parse(label), Err(ClusterParseError::MissingField {
            field: "cluster_freq", label: label.to_string()
        }));
    }

    #[test]
    fn test_invalid_values() {
        let label = "cluster-1_ReadCount-99999999999999999999999 cluster_freq:0.5";
        assert!(matches!(ClusterLabel::parse(label), Err(ClusterParseError::InvalidValue { field: "ReadCount", .. })));

        let label = "cluster-1_ReadCount-10 cluster_freq:1.5";
        assert!(matches!(ClusterLabel::parse(label), Err(ClusterParseError::FrequencyRange { .. })));
    }

    #[test]
    fn test_record_from_label() {
        let record = ClusterRecord::from_label(
            "sample1", "s_cluster-0_ReadCount-90 uchime_score:-1 cluster_freq:1.0", b"ACGT", false
        ).unwrap();
        assert_eq!(record.sample_name, "sample1");
        assert_eq!(record.cluster_id, "0");
        assert_eq!(record.sequence, b"ACGT".to_vec());
        assert_eq!(record.read_count, 90);
        assert!(!record.passed_filter);
        assert!(!record.possibly_chimeric);
    }

    #[test]
    fn test_sample_clusters_order() {
        let passed = ClusterRecord::from_label("s", "cluster-0_ReadCount-5 cluster_freq:0.5", b"A", true).unwrap();
        let failed = ClusterRecord::from_label("s", "cluster-1_ReadCount-3 cluster_freq:0.3", b"C", false).unwrap();
        let clusters = SampleClusters {
            passed: vec![passed],
            failed: vec![failed]
        };
        let order: Vec<&str> = clusters.iter().map(|c| c.cluster_id.as_str()).collect();
        assert_eq!(order, vec!["0", "1"]);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters.total_read_count(), 8);
        assert!(SampleClusters::default().is_empty());
    }
}
