#![no_main]

use libfuzzer_sys::fuzz_target;
use textclass::config::{ConfigLoader, resolve_paths};

fuzz_target!(|data: &[u8]| {
    if let Ok(yaml) = std::str::from_utf8(data) {
        // Any input may fail to load; none may panic.
        if let Ok(result) = ConfigLoader::with_defaults().load_from_str(yaml) {
            let resolved = resolve_paths(&result.config, std::path::Path::new("/srv/textclass"));
            let _ = resolved.to_yaml();
        }
    }
});
