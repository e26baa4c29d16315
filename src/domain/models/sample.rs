//! Naming of read files.

use std::path::Path;

/// Sample name of a read file: the file name with `.gz` and then
/// `.fastq` / `.fq` removed. `s1_R1.fastq.gz` becomes `s1_R1`.
pub fn sample_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    let name = name
        .strip_suffix(".fastq")
        .or_else(|| name.strip_suffix(".fq"))
        .unwrap_or(name);
    name.to_string()
}

/// Whether the file is gzip-compressed, judged by extension.
pub fn is_gzipped(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_stem() {
        assert_eq!(sample_stem(Path::new("/data/s1.fastq")), "s1");
        assert_eq!(sample_stem(Path::new("/data/s1.fastq.gz")), "s1");
        assert_eq!(sample_stem(Path::new("s1_R1.fq.gz")), "s1_R1");
        assert_eq!(sample_stem(Path::new("reads.txt")), "reads.txt");
    }

    #[test]
    fn test_is_gzipped() {
        assert!(is_gzipped(Path::new("a.fastq.gz")));
        assert!(is_gzipped(Path::new("a.FQ.GZ")));
        assert!(!is_gzipped(Path::new("a.fastq")));
    }
}
