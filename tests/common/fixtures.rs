//! Query log corpora used across harnesses.

/// The canonical query line: client `192.168.0.123` asking for
/// `bitnebula.com IN A`.
pub const SAMPLE_LINE: &str = "05-Jun-2021 07:24:47.780 queries: info: client @0xadfc0030 192.168.0.123#59542 (bitnebula.com): query: bitnebula.com IN A + (192.168.0.456)";

/// Query lines in the shapes BIND writes them, with and without the
/// `@0x...` annotation, in mixed case.
pub const CORPUS_QUERIES: &[&str] = &[
    SAMPLE_LINE,
    "05-Jun-2021 07:24:48.001 queries: info: client @0xadfc0030 192.168.0.123#59543 (www.example.com): query: www.example.com IN AAAA + (192.168.0.1)",
    "05-Jun-2021 07:24:48.120 queries: info: client 10.0.0.7#41000 (Example.COM): query: Example.COM IN MX +E(0) (10.0.0.1)",
    "05-Jun-2021 07:24:49.310 client @0x7f01 10.0.0.8#5353 (_dns.resolver.arpa): query: _dns.resolver.arpa IN SVCB +E(0)DC (10.0.0.1)",
    "05-Jun-2021 07:24:50.002 queries: info: client @0xadfc0030 fe80::1#4242 (ipv6.example.net): query: ipv6.example.net IN A + (fe80::53)",
];

/// Lines that appear in a query log but are not queries.
pub const CORPUS_NOISE: &[&str] = &[
    "",
    "05-Jun-2021 07:24:47.000 general: info: zone example.com/IN: loaded serial 2021060501",
    "05-Jun-2021 07:24:47.100 general: info: all zones loaded",
    "05-Jun-2021 07:24:47.200 network: info: listening on IPv4 interface lo, 127.0.0.1#53",
    "client 10.0.0.1#53 but never the magic word",
];

/// Generate `n` query lines cycling over a handful of clients, names and
/// types.
pub fn corpus_high_volume(n: usize) -> Vec<String> {
    const NAMES: &[&str] = &["bitnebula.com", "example.com", "www.example.org", "api.internal", "cdn.example.net"];
    const TYPES: &[&str] = &["A", "AAAA", "MX", "TXT", "HTTPS"];
    (0..n)
        .map(|i| {
            format!(
                "05-Jun-2021 07:25:{:02}.{:03} queries: info: client @0xadfc0030 10.0.{}.{}#{} ({name}): query: {name} IN {ty} + (10.0.0.1)",
                i % 60,
                i % 1000,
                i % 4,
                i % 200,
                40000 + i % 20000,
                name = NAMES[i % NAMES.len()],
                ty = TYPES[(i / NAMES.len()) % TYPES.len()],
            )
        })
        .collect()
}
