#![no_main]

use libfuzzer_sys::fuzz_target;
use rand::SeedableRng;
use rand::rngs::StdRng;
use trafficlight::phase::timing::parse_duration;
use trafficlight::phase::CycleRange;

fuzz_target!(|input: (&str, &str, u64)| {
    let (min, max, seed) = input;
    let (Ok(min), Ok(max)) = (parse_duration("cycle.min", min), parse_duration("cycle.max", max))
    else {
        return;
    };
    if let Ok(range) = CycleRange::new(min, max) {
        let mut rng = StdRng::seed_from_u64(seed);
        let d = range.sample(&mut rng);
        assert!(d >= range.min() && d <= range.max());
    }
});
