//! Error types for the evaluation pipeline.

/// Creates the Error, ErrorKind, ResultExt, and Result types
error_chain! {
    errors {
        MalformedLine(file: String, line: String) {
            description("malformed input line")
            display("malformed line in {}: {:?}", file, line)
        }
        FileTooShort(file: String, expected: usize) {
            description("file ended inside its fixed header")
            display("{} has fewer than {} header lines", file, expected)
        }
        InvalidBound(instance: String, lb: i64, ub: i64) {
            description("lower bound exceeds upper bound")
            display("bound for {} has lb {} > ub {}", instance, lb, ub)
        }
        UnknownDataset(instance: String) {
            description("no dataset for instance id")
            display("cannot derive a dataset group for {}", instance)
        }
        NoRunRanges(root: String) {
            description("no runs_<start>-<end> directory")
            display("no runs_<start>-<end> directory under {}", root)
        }
        Plot(message: String) {
            description("error in drawing a plot")
            display("plot error: {}", message)
        }
    }

    foreign_links {
        Io(::std::io::Error);
        Csv(::csv::Error);
        Regex(::regex::Error);
        Toml(::toml::de::Error);
        ParseInt(::std::num::ParseIntError);
        ParseFloat(::std::num::ParseFloatError);
    }
}
