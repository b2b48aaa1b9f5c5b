//! Common utilities for benchmarks

use criterion::Criterion;
use pprof::criterion::{Output, PProfProfiler};

use pod_core::error::PodResult;
use pod_core::types::{CandidateRecord, Dependency, Target, Version, VersionRange};

/// Configure criterion with flamegraph profiling support
pub fn criterion_config() -> Criterion {
    Criterion::default()
        .warm_up_time(std::time::Duration::from_secs(3))
        .measurement_time(std::time::Duration::from_secs(10))
        .sample_size(100)
        .with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)))
}

/// Targets plus the candidates a resolution runs against
#[derive(Debug, Clone)]
pub struct Universe {
    pub targets: Vec<Target>,
    pub available: Vec<CandidateRecord>,
}

fn name(prefix: &str, index: usize) -> String {
    format!("{}-{}", prefix, index)
}

fn versions(count: usize) -> impl Iterator<Item = Version> {
    (0..count).map(|i| Version::new(1, (i / 10) as u64, (i % 10) as u64))
}

/// `pkg-0 -> pkg-1 -> ... -> pkg-{depth-1}`, each with `per_package` versions
pub fn chain_universe(depth: usize, per_package: usize) -> PodResult<Universe> {
    let mut available = Vec::with_capacity(depth * per_package);
    for index in 0..depth {
        for version in versions(per_package) {
            let deps = if index + 1 < depth {
                vec![Dependency::new(name("pkg", index + 1), VersionRange::parse("[1.0,2.0)")?)]
            } else {
                Vec::new()
            };
            available.push(CandidateRecord::new(name("pkg", index), version, deps)?);
        }
    }

    Ok(Universe {
        targets: vec![Target::new(name("pkg", 0))],
        available,
    })
}

/// One root depending on `width` independent leaves
pub fn wide_universe(width: usize, per_package: usize) -> PodResult<Universe> {
    let deps = (0..width).map(|i| Dependency::any(name("leaf", i))).collect::<Vec<_>>();
    let mut available = vec![CandidateRecord::new("root", Version::new(1, 0, 0), deps)?];

    for index in 0..width {
        available.extend(versions(per_package).map(|v| CandidateRecord::leaf(name("leaf", index), v)));
    }

    Ok(Universe {
        targets: vec![Target::new("root")],
        available,
    })
}

/// Layers of `width` packages where every package depends on the whole next
/// layer
pub fn diamond_universe(layers: usize, width: usize) -> PodResult<Universe> {
    let mut available = Vec::new();
    for layer in 0..layers {
        for index in 0..width {
            let deps = if layer + 1 < layers {
                (0..width)
                    .map(|next| Dependency::any(format!("layer{}-{}", layer + 1, next)))
                    .collect::<Vec<_>>()
            } else {
                Vec::new()
            };
            available.push(CandidateRecord::new(
                format!("layer{}-{}", layer, index),
                Version::new(1, 0, 0),
                deps,
            )?);
        }
    }

    Ok(Universe {
        targets: (0..width).map(|i| Target::new(format!("layer0-{}", i))).collect(),
        available,
    })
}

/// Two targets where only the last of `count` versions of `x` agrees with `y`
/// on the shared dependency; pruning has to rule out every other version
pub fn backtracking_universe(count: usize) -> PodResult<Universe> {
    let mut available = Vec::new();
    for slot in 1..=count {
        let version = Version::new(slot as u64, 0, 0);
        available.push(CandidateRecord::new(
            "x",
            version.clone(),
            vec![Dependency::new("shared", VersionRange::exact(version.clone()))],
        )?);
        available.push(CandidateRecord::leaf("shared", version));
    }
    available.push(CandidateRecord::new(
        "y",
        Version::new(1, 0, 0),
        vec![Dependency::new("shared", VersionRange::exact(Version::new(count as u64, 0, 0)))],
    )?);

    Ok(Universe {
        targets: vec![Target::new("x"), Target::new("y")],
        available,
    })
}

/// Version strings like `1.2.3`, `1.2.3-beta.4`
pub fn version_strings(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            let base = format!("{}.{}.{}", i / 100, (i / 10) % 10, i % 10);
            if i % 4 == 0 {
                format!("{}-beta.{}", base, i % 7)
            } else {
                base
            }
        })
        .collect()
}

/// Range strings in interval notation
pub fn range_strings(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            let major = (i / 10) + 1;
            let minor = i % 10;
            match i % 5 {
                0 => format!("{}.{}", major, minor),
                1 => format!("[{}.{}]", major, minor),
                2 => format!("[{}.{}, {}.0)", major, minor, major + 1),
                3 => format!("(,{}.{}]", major, minor),
                _ => "*".to_string(),
            }
        })
        .collect()
}
