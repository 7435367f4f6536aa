//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::time::Duration;

use harvester_core::catalog::{CatalogEntry, TransferStatus};
use harvester_core::download::RetryPolicy;

/// A catalog entry with a fresh status and the given download link.
pub fn entry(id: &str, title: &str, download_url: &str) -> CatalogEntry {
    CatalogEntry {
        id: id.to_string(),
        author: "A. Smith".to_string(),
        title: title.to_string(),
        year: Some(2020),
        language: "english".to_string(),
        md5: format!("md5{id}"),
        cover_url: format!("covers/4821/{id}.jpg"),
        identifier: String::new(),
        download_url: download_url.to_string(),
        classification_code: Some(510),
        transfer_status: TransferStatus::initial("01/01/2020 00:00:00"),
    }
}

/// Millisecond backoff so retry tests finish quickly.
pub fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(
        max_attempts,
        Duration::from_millis(1),
        Duration::from_millis(5),
        1.0,
    )
}

/// Classification response with a single match.
pub fn single_match(sfa: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<classify xmlns="http://classify.oclc.org">
  <response code="2"/>
  <recommendations>
    <ddc>
      <mostPopular holdings="120" nsfa="{sfa}" sfa="{sfa}"/>
    </ddc>
  </recommendations>
</classify>"#
    )
}

/// Classification response listing several works.
pub fn multiple_works(owi: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<classify xmlns="http://classify.oclc.org">
  <response code="4"/>
  <works>
    <work author="Smith" editions="3" holdings="40" owi="{owi}" title="Widgets"/>
    <work author="Smith" editions="1" holdings="2" owi="99999" title="Widgets II"/>
  </works>
</classify>"#
    )
}

/// Classification response with only a code.
pub fn code_only(code: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<classify xmlns="http://classify.oclc.org"><response code="{code}"/></classify>"#
    )
}
