//! The fixed symbol catalog.
//!
//! Built once at startup (either the built-in table or a config override) and
//! never mutated. Declaration order is preserved so emission bursts walk the
//! symbols in a reproducible order; lookups go through an `AHashMap` index.

use ahash::AHashMap;

use crate::error::PtError;
use crate::types::Symbol;

/// Description returned for tickers the catalog does not know.
pub const UNKNOWN_DESCRIPTION: &str = "No description available.";

const BUILTIN: &[(&str, &str)] = &[
    ("AAPL", "Apple Inc. - Technology company that designs consumer electronics, software, and online services."),
    ("GOOG", "Alphabet Inc. - Multinational technology company specializing in internet services and AI."),
    ("TSLA", "Tesla Inc. - Electric vehicle and clean energy company."),
    ("AMZN", "Amazon.com Inc. - E-commerce, cloud computing, and artificial intelligence company."),
    ("MSFT", "Microsoft Corporation - Technology company developing software, hardware, and cloud services."),
    ("NVDA", "NVIDIA Corporation - Technology company designing graphics processing units and AI chips."),
    ("META", "Meta Platforms Inc. - Social media and virtual reality technology company."),
    ("NFLX", "Netflix Inc. - Streaming entertainment service company."),
    ("AMD", "Advanced Micro Devices Inc. - Semiconductor company developing CPUs and GPUs."),
    ("INTC", "Intel Corporation - Multinational semiconductor chip manufacturer."),
    ("ORCL", "Oracle Corporation - Enterprise software and cloud computing company."),
    ("CRM", "Salesforce Inc. - Cloud-based customer relationship management platform."),
    ("ADBE", "Adobe Inc. - Software company known for creative and multimedia products."),
    ("CSCO", "Cisco Systems Inc. - Networking hardware and telecommunications equipment company."),
    ("AVGO", "Broadcom Inc. - Designer and developer of semiconductor and infrastructure software."),
    ("QCOM", "Qualcomm Inc. - Semiconductor and telecommunications equipment company."),
    ("TXN", "Texas Instruments Inc. - Semiconductor design and manufacturing company."),
    ("AMAT", "Applied Materials Inc. - Supplier of equipment for semiconductor manufacturing."),
    ("LRCX", "Lam Research Corporation - Semiconductor equipment manufacturer."),
    ("KLAC", "KLA Corporation - Process control and yield management solutions provider."),
    ("SNPS", "Synopsys Inc. - Electronic design automation and semiconductor IP company."),
    ("CDNS", "Cadence Design Systems Inc. - Electronic design automation software company."),
    ("MRVL", "Marvell Technology Inc. - Semiconductor company for data infrastructure."),
    ("WDAY", "Workday Inc. - Enterprise cloud applications for finance and HR."),
    ("ZS", "Zscaler Inc. - Cloud-based information security company."),
];

/// Immutable ticker → description table.
#[derive(Debug, Clone)]
pub struct Catalog {
    symbols: Vec<Symbol>,
    index: AHashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog from an explicit symbol list.
    ///
    /// Fails on an empty list, an empty ticker, or a duplicate ticker.
    pub fn new(symbols: Vec<Symbol>) -> Result<Self, PtError> {
        if symbols.is_empty() {
            return Err(PtError::Catalog("catalog has no symbols".into()));
        }

        let mut index = AHashMap::with_capacity(symbols.len());
        for (i, sym) in symbols.iter().enumerate() {
            if sym.ticker.is_empty() {
                return Err(PtError::Catalog(format!("entry {i} has an empty ticker")));
            }
            if index.insert(sym.ticker.clone(), i).is_some() {
                return Err(PtError::Catalog(format!("duplicate ticker: {}", sym.ticker)));
            }
        }

        Ok(Self { symbols, index })
    }

    /// The built-in 25-symbol technology catalog.
    pub fn builtin() -> Self {
        let symbols: Vec<Symbol> = BUILTIN.iter().map(|(t, d)| Symbol::new(*t, *d)).collect();
        let index = symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (s.ticker.clone(), i))
            .collect();
        Self { symbols, index }
    }

    /// All entries in declaration order.
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(|s| s.ticker.as_str())
    }

    pub fn get(&self, ticker: &str) -> Option<&Symbol> {
        self.index.get(ticker).map(|&i| &self.symbols[i])
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.index.contains_key(ticker)
    }

    /// Description for `ticker`, or [`UNKNOWN_DESCRIPTION`].
    pub fn description(&self, ticker: &str) -> &str {
        self.get(ticker)
            .map(|s| s.description.as_str())
            .unwrap_or(UNKNOWN_DESCRIPTION)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_has_unique_tickers() {
        let c = Catalog::builtin();
        assert_eq!(c.len(), 25);
        // re-validating through `new` catches any duplicate in the table
        assert!(Catalog::new(c.symbols().to_vec()).is_ok());
    }

    #[test]
    fn description_lookup() {
        let c = Catalog::builtin();
        assert!(c.description("TSLA").starts_with("Tesla"));
        assert_eq!(c.description("XXXX"), UNKNOWN_DESCRIPTION);
    }

    #[test]
    fn declaration_order_preserved() {
        let c = Catalog::builtin();
        let first: Vec<&str> = c.tickers().take(3).collect();
        assert_eq!(first, ["AAPL", "GOOG", "TSLA"]);
    }

    #[test]
    fn rejects_duplicates_and_empty() {
        assert!(Catalog::new(vec![]).is_err());
        let dup = vec![Symbol::new("AAPL", "a"), Symbol::new("AAPL", "b")];
        assert!(matches!(Catalog::new(dup), Err(PtError::Catalog(_))));
        assert!(Catalog::new(vec![Symbol::new("", "blank")]).is_err());
    }
}
