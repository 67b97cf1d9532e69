fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use tusbridge_protocol::{
        AbortResponse, EventKind, PauseResponse, Rejection, ResumeResponse, SessionInfo,
        UploadEvent, UploadIdRequest, UploadRequest, UploadResponse,
    };

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    /// Normalizes JSON numbers so that `50` and `50.0` compare as equal.
    ///
    /// JavaScript has a single number type; the host bridge may hand back
    /// either form for the same value.
    fn normalize_value(v: &serde_json::Value) -> serde_json::Value {
        match v {
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) => serde_json::json!(f),
                None => v.clone(),
            },
            serde_json::Value::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), normalize_value(v)))
                    .collect(),
            ),
            serde_json::Value::Array(arr) => {
                serde_json::Value::Array(arr.iter().map(normalize_value).collect())
            }
            _ => v.clone(),
        }
    }

    /// Deserializes a fixture, re-serializes it and compares the JSON values.
    fn roundtrip_test<T>(name: &str) -> T
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));

        assert_eq!(
            normalize_value(&fixture),
            normalize_value(&reserialized),
            "roundtrip mismatch for {name}:\n  fixture: {fixture}\n  rust:    {reserialized}"
        );
        parsed
    }

    // --- Requests and responses ---

    #[test]
    fn fixture_upload_request() {
        let req = roundtrip_test::<UploadRequest>("upload_request.json");
        assert_eq!(req.chunk_size, Some(1_048_576));
        assert_eq!(req.metadata["filetype"], "video/mp4");
    }

    #[test]
    fn fixture_upload_id_request() {
        roundtrip_test::<UploadIdRequest>("upload_id_request.json");
    }

    #[test]
    fn fixture_upload_response() {
        roundtrip_test::<UploadResponse>("upload_response.json");
    }

    #[test]
    fn fixture_pause_response() {
        roundtrip_test::<PauseResponse>("pause_response.json");
    }

    #[test]
    fn fixture_resume_response() {
        roundtrip_test::<ResumeResponse>("resume_response.json");
    }

    #[test]
    fn fixture_abort_response() {
        roundtrip_test::<AbortResponse>("abort_response.json");
    }

    #[test]
    fn fixture_rejection() {
        roundtrip_test::<Rejection>("rejection.json");
    }

    // --- Listener events ---

    #[test]
    fn fixture_event_start() {
        let e = roundtrip_test::<UploadEvent>("event_start.json");
        assert_eq!(e.kind(), EventKind::Start);
        assert_eq!(e.context()["filename"], "clip.mp4");
    }

    #[test]
    fn fixture_event_progress() {
        let UploadEvent::Progress(p) = roundtrip_test::<UploadEvent>("event_progress.json") else {
            panic!("expected onProgress");
        };
        assert_eq!(p.progress, Some(50.0));
        assert_eq!(p.total_bytes, Some(10_000_000));
    }

    #[test]
    fn fixture_event_progress_unknown_total() {
        let UploadEvent::Progress(p) =
            roundtrip_test::<UploadEvent>("event_progress_unknown_total.json")
        else {
            panic!("expected onProgress");
        };
        assert!(p.progress.is_none());
        assert!(p.total_bytes.is_none());
    }

    #[test]
    fn fixture_event_success() {
        let e = roundtrip_test::<UploadEvent>("event_success.json");
        assert!(e.is_terminal());
    }

    #[test]
    fn fixture_event_error() {
        let e = roundtrip_test::<UploadEvent>("event_error.json");
        assert_eq!(e.kind(), EventKind::Error);
    }

    #[test]
    fn fixture_session_info() {
        let info = roundtrip_test::<SessionInfo>("session_info.json");
        assert!(info.paused);
        assert!(info.error.is_none());
    }

    /// The `payload()` of an event is exactly the fixture's `data` object.
    #[test]
    fn event_payload_matches_data() {
        for name in [
            "event_start.json",
            "event_progress.json",
            "event_success.json",
            "event_error.json",
        ] {
            let fixture = load_fixture(name);
            let event: UploadEvent = serde_json::from_value(fixture.clone()).unwrap();
            assert_eq!(
                fixture["event"].as_str(),
                Some(event.kind().as_str()),
                "{name}"
            );
            assert_eq!(
                normalize_value(&event.payload().unwrap()),
                normalize_value(&fixture["data"]),
                "{name}"
            );
        }
    }
}
