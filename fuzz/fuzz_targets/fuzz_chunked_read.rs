#![no_main]

use libfuzzer_sys::fuzz_target;
use tokio::io::AsyncReadExt;
use tokio_mpstream::{FormStream, Part};

fuzz_target!(|data: &[u8]| {
    // first byte picks the read size, the rest is split into fields on 0xff
    let Some((&chunk, rest)) = data.split_first() else {
        return;
    };
    let chunk = chunk as usize + 1;

    let build = || -> Vec<Part> {
        rest.split(|&b| b == 0xff)
            .enumerate()
            .map(|(i, value)| Part::bytes(&format!("f{}", i), value.to_vec()))
            .collect()
    };

    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();

    rt.block_on(async {
        let mut whole = FormStream::with_boundary("fuzz-boundary", build()).unwrap();
        let mut expected = Vec::new();
        whole.read_to_end(&mut expected).await.unwrap();
        assert_eq!(expected.len() as u64, whole.content_length());

        let mut chunked = FormStream::with_boundary("fuzz-boundary", build()).unwrap();
        let mut out = Vec::new();
        let mut buf = vec![0u8; chunk];
        loop {
            let n = chunked.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, expected);
    });
});
