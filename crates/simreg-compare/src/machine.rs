//! Library paths from a machine profile (`configs/<machine>.config`)

use regex::Regex;
use std::sync::OnceLock;

/// `NAME value` pairs from every line mentioning `PATH`, in file order
pub fn parse_machine_paths(text: &str) -> Vec<(String, String)> {
    static SPLIT: OnceLock<Regex> = OnceLock::new();
    let split = SPLIT
        .get_or_init(|| Regex::new(r"[ \t]+|:=").expect("internal built-in regex must compile"));

    text.lines()
        .filter(|line| line.contains("PATH"))
        .filter_map(|line| {
            let mut tokens = split.split(line).filter(|t| !t.is_empty());
            let name = tokens.next()?;
            Some((name.to_string(), tokens.next().unwrap_or_default().to_string()))
        })
        .collect()
}

/// Point each `NAME :=` assignment of a Makefile at the profile's path.
///
/// The rest of the original assignment is commented out.
pub fn apply_machine_paths(makefile: &str, paths: &[(String, String)]) -> String {
    let mut out = makefile.to_string();
    for (name, path) in paths {
        out = out.replace(&format!("{name} :="), &format!("{name} := {path}\n#"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_path_lines() {
        let profile = "\
# comment
CUDA_PATH       /usr/local/cuda
HDF5_PATH := /opt/hdf5
MPI_PATH
CXX   icpc
";
        assert_eq!(
            parse_machine_paths(profile),
            [
                ("CUDA_PATH".to_string(), "/usr/local/cuda".to_string()),
                ("HDF5_PATH".to_string(), "/opt/hdf5".to_string()),
                ("MPI_PATH".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn rewrites_makefile_assignments() {
        let makefile = "HDF5_PATH := /default/hdf5\nCXX := g++\n";
        let out = apply_machine_paths(makefile, &[("HDF5_PATH".into(), "/opt/hdf5".into())]);
        assert_eq!(out, "HDF5_PATH := /opt/hdf5\n# /default/hdf5\nCXX := g++\n");
    }
}
