#![no_main]

use libfuzzer_sys::fuzz_target;
use trafficlight::config::ConfigLoader;

fuzz_target!(|data: &[u8]| {
    if let Ok(yaml) = std::str::from_utf8(data) {
        let loader = ConfigLoader::with_defaults();
        if let Ok(config) = loader.load_from_str(yaml) {
            // Anything the loader accepts must build a controller config
            assert!(config.controller_config().is_ok());
        }
    }
});
