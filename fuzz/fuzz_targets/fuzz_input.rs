// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use vidlens::config::UploadConfig;
use vidlens::ingestion::FileState;
use vidlens::VideoUpload;

#[derive(Arbitrary, Debug)]
struct Input {
    file_name: String,
    data: Vec<u8>,
    state: String,
}

fuzz_target!(|input: Input| {
    let upload = VideoUpload::new(input.file_name, input.data);
    let _ = upload.validate(&UploadConfig::default());
    let _ = upload.extension();

    let _ = serde_json::from_value::<FileState>(serde_json::Value::String(input.state));
});
