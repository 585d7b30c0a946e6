use crate::build_system::BuildSystem;
use crate::environment::{CC, CFLAGS, CXX, CXXFLAGS, FUZZER_LIB};
use crate::profile::EngineProfile;
use crate::runner::FuzzerRunner;
use log::info;
use std::path::Path;

/// Builds and fuzzes benchmarks with the entropy-guided engine.
///
/// The adapter holds no state between calls. It only translates the two
/// harness requests into calls on its collaborators, and any error they
/// return is passed back unchanged.
#[derive(Debug, Clone, Default)]
pub struct EntropicAdapter {
    profile: EngineProfile,
}

impl EntropicAdapter {
    pub fn new(profile: EngineProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &EngineProfile {
        &self.profile
    }

    /// Instruments the benchmark for the engine and links it against the
    /// engine library.
    ///
    /// The compile flags are appended to both `CFLAGS` and `CXXFLAGS`, then
    /// `CC`, `CXX` and `FUZZER_LIB` are overwritten, and finally
    /// `build_benchmark` runs exactly once.
    pub fn build<B: BuildSystem>(&self, build_system: &mut B) -> Result<(), B::Error> {
        let flags = self.profile.compile_flags();
        build_system.append_flags(CFLAGS, &flags);
        build_system.append_flags(CXXFLAGS, &flags);

        build_system.set_env(CC, &self.profile.cc);
        build_system.set_env(CXX, &self.profile.cxx);
        build_system.set_env(FUZZER_LIB, &self.profile.fuzzer_lib_value());

        info!(
            "Building with {} and {}, linking {}",
            self.profile.cc,
            self.profile.cxx,
            self.profile.fuzzer_lib.display()
        );
        build_system.build_benchmark()
    }

    /// Runs a campaign. Paths go to the runner untouched, followed by the
    /// engine's runtime flags.
    pub fn fuzz<R: FuzzerRunner>(
        &self,
        runner: &mut R,
        input_corpus: &Path,
        output_corpus: &Path,
        target_binary: &Path,
    ) -> Result<(), R::Error> {
        runner.run_fuzzer(
            input_corpus,
            output_corpus,
            target_binary,
            &self.profile.runtime_flags,
        )
    }
}
