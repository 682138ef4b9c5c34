//! Maps raw request paths to friendly endpoint names.

use std::sync::LazyLock;

use regex::Regex;

/// Endpoint category used when no table entry matches.
pub const FALLBACK_CATEGORY: &str = "api";

/// Ordered `(pattern, friendly name, category)` table. First match wins,
/// so more specific routes come before the generic ones.
const ENDPOINT_TABLE: &[(&str, &str, &str)] = &[
    (r"(?:^|/)health/?$", "health check", "system"),
    (r"(?:^|/)wallets/create/?$", "wallet creation", "wallet"),
    (r"(?:^|/)wallets/restore/?$", "wallet restore", "wallet"),
    (r"/balances?/?$", "balance query", "wallet"),
    (r"/send/?$", "send transaction", "transactions"),
    (r"/transactions/?$", "transaction history", "transactions"),
    (r"/transactions/[^/]+/?$", "transaction details", "transactions"),
    (r"/addresses(?:/[^/]+)?/?$", "address lookup", "wallet"),
    (r"(?:^|/)fees?(?:/estimate)?/?$", "fee estimate", "network"),
    (r"(?:^|/)(?:prices?|market)(?:/.*)?$", "market data", "market"),
    (r"(?:^|/)settings(?:/.*)?$", "settings", "settings"),
    (r"(?:^|/)wallets/?$", "wallet list", "wallet"),
    (r"(?:^|/)wallets/[^/]+/?$", "wallet details", "wallet"),
];

struct EndpointRule {
    pattern: Regex,
    name: &'static str,
    category: &'static str,
}

static RULES: LazyLock<Vec<EndpointRule>> = LazyLock::new(|| {
    ENDPOINT_TABLE
        .iter()
        .filter_map(|(pattern, name, category)| {
            Regex::new(pattern).ok().map(|pattern| EndpointRule {
                pattern,
                name,
                category,
            })
        })
        .collect()
});

/// Friendly name and grouping category of an endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEndpoint {
    /// Human-readable name, e.g. "balance query".
    pub name: String,
    /// Grouping category, e.g. "wallet".
    pub category: String,
}

/// Resolves a path (query string allowed) against the endpoint table.
///
/// Unknown paths resolve to themselves with category [`FALLBACK_CATEGORY`].
#[must_use]
pub fn resolve_endpoint(path: &str) -> ResolvedEndpoint {
    let route = path.split(['?', '#']).next().unwrap_or(path);
    RULES
        .iter()
        .find(|rule| rule.pattern.is_match(route))
        .map_or_else(
            || ResolvedEndpoint {
                name: route.to_string(),
                category: FALLBACK_CATEGORY.to_string(),
            },
            |rule| ResolvedEndpoint {
                name: rule.name.to_string(),
                category: rule.category.to_string(),
            },
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn name_of(path: &str) -> String {
        resolve_endpoint(path).name
    }

    #[test]
    fn every_table_pattern_compiles() {
        assert_eq!(RULES.len(), ENDPOINT_TABLE.len());
    }

    #[test]
    fn resolves_wallet_routes() {
        assert_eq!(name_of("/wallets"), "wallet list");
        assert_eq!(name_of("/wallets/"), "wallet list");
        assert_eq!(name_of("/wallets/w-42"), "wallet details");
        assert_eq!(name_of("/wallets/create"), "wallet creation");
        assert_eq!(name_of("/wallets/restore"), "wallet restore");
        assert_eq!(name_of("/wallets/w-42/balance"), "balance query");
    }

    #[test]
    fn resolves_transaction_routes() {
        assert_eq!(name_of("/wallets/w-1/transactions?page=3"), "transaction history");
        assert_eq!(name_of("/wallets/w-1/transactions/tx-9"), "transaction details");
        assert_eq!(name_of("/wallets/w-1/send"), "send transaction");
    }

    #[test]
    fn resolves_with_base_path_prefix() {
        let resolved = resolve_endpoint("/api/v1/health");
        assert_eq!(resolved.name, "health check");
        assert_eq!(resolved.category, "system");
    }

    #[test]
    fn unknown_path_falls_back_to_itself() {
        let resolved = resolve_endpoint("/staking/pools?active=true");
        assert_eq!(resolved.name, "/staking/pools");
        assert_eq!(resolved.category, FALLBACK_CATEGORY);
    }
}
