// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use arbitrary::Arbitrary;
use chrono::{Local, TimeZone};
use libfuzzer_sys::fuzz_target;
use shotsort::classify::match_keywords;
use shotsort::config::CategoryMap;
use shotsort::naming::{split_extension, synthesize_filename};

#[derive(Arbitrary, Debug)]
struct Input<'a> {
    original: &'a str,
    category: &'a str,
    text: &'a str,
    keywords: Vec<&'a str>,
}

fuzz_target!(|input: Input<'_>| {
    let (stem, ext) = split_extension(input.original);
    assert_eq!(format!("{}{}", stem, ext), input.original);

    let Some(modified) = Local.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).single() else {
        return;
    };
    let name = synthesize_filename(input.original, input.category, input.text, &modified, true);
    assert!(!name.contains('/') || input.category.contains('/') || ext.contains('/'));

    let categories: CategoryMap = [(input.category, input.keywords.clone())]
        .into_iter()
        .collect();
    if let Some(hit) = match_keywords(input.text, &categories) {
        assert_eq!(hit, input.category);
    }
});
