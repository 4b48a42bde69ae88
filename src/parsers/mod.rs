mod scan_telegram;

pub(crate) use self::scan_telegram::parse_scan_telegram;

#[cfg(test)]
pub(crate) use self::scan_telegram::test_support;
