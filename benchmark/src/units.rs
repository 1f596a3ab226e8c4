/// How sizes and rates are abbreviated in the report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Abbreviation {
    /// Powers of 1024: Ki, Mi, Gi, Ti, Pi.
    #[default]
    Binary,
    /// Powers of 1000: K, M, G, T, P.
    Decimal,
    /// Plain numbers.
    None,
}

const BINARY: &[(u64, &str)] = &[
    (1 << 50, "Pi"),
    (1 << 40, "Ti"),
    (1 << 30, "Gi"),
    (1 << 20, "Mi"),
    (1 << 10, "Ki"),
    (1, "  "),
];

const DECIMAL: &[(u64, &str)] = &[
    (1_000_000_000_000_000, "P"),
    (1_000_000_000_000, "T"),
    (1_000_000_000, "G"),
    (1_000_000, "M"),
    (1_000, "K"),
    (1, " "),
];

const NONE: &[(u64, &str)] = &[(1, "")];

impl Abbreviation {
    fn table(self) -> &'static [(u64, &'static str)] {
        match self {
            Abbreviation::Binary => BINARY,
            Abbreviation::Decimal => DECIMAL,
            Abbreviation::None => NONE,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SizeFormatter {
    abbrev: Abbreviation,
}

impl SizeFormatter {
    pub fn new(abbrev: Abbreviation) -> Self {
        SizeFormatter { abbrev }
    }

    /// Formats `value` as `"<scaled> <suffix>"` with `precision` decimals,
    /// picking the largest factor not above `value`. Values below 1 use the
    /// unit suffix.
    pub fn format(&self, value: f64, precision: usize) -> String {
        let table = self.abbrev.table();
        let (factor, suffix) = table
            .iter()
            .find(|(factor, _)| value >= *factor as f64)
            .or_else(|| table.last())
            .copied()
            .unwrap_or((1, ""));
        format!("{:.*} {}", precision, value / factor as f64, suffix)
    }

    /// Byte counts such as the device size or a block size.
    pub fn bytes(&self, value: u64) -> String {
        self.format(value as f64, 0)
    }

    /// Rates such as bytes or bits per second.
    pub fn rate(&self, value: f64) -> String {
        self.format(value, 1)
    }
}
