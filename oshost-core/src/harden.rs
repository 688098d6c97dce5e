//! Best-effort process hardening.
//!
//! [`harden_process`] walks a fixed table of six [`MitigationStep`]s.  Each
//! step optionally reads the current policy word, sets its own bits and
//! installs the result.  A failing step is reported at [`Severity::Log`]
//! and the walk moves on: no step depends on another, none is retried, and
//! the caller never sees a failure.
//!
//! Flag bits follow the layouts of the `PROCESS_MITIGATION_*_POLICY`
//! structures, each of which is a single 32-bit word.

use std::path::PathBuf;

use crate::errors::ErrorCode;
use crate::platform::{MitigationApi, MitigationPolicy};
use crate::report::{Reporter, Severity};

pub mod flags {
    pub const ASLR_FORCE_RELOCATE_IMAGES: u32 = 1 << 1;
    pub const ASLR_DISALLOW_STRIPPED_IMAGES: u32 = 1 << 3;

    pub const DYNAMIC_CODE_PROHIBIT: u32 = 1 << 0;
    pub const DYNAMIC_CODE_ALLOW_THREAD_OPT_OUT: u32 = 1 << 1;
    pub const DYNAMIC_CODE_ALLOW_REMOTE_DOWNGRADE: u32 = 1 << 2;

    pub const STRICT_HANDLE_RAISE_ON_INVALID: u32 = 1 << 0;
    pub const STRICT_HANDLE_PERMANENTLY_ENABLED: u32 = 1 << 1;

    pub const EXTENSION_POINT_DISABLE: u32 = 1 << 0;

    pub const SIGNATURE_MITIGATION_OPT_IN: u32 = 1 << 2;

    pub const IMAGE_LOAD_NO_REMOTE: u32 = 1 << 0;
    pub const IMAGE_LOAD_NO_LOW_LABEL: u32 = 1 << 1;
    pub const IMAGE_LOAD_PREFER_SYSTEM32: u32 = 1 << 2;
}

/// What a step may look at besides the policy word.
pub struct HardenEnv<'a> {
    pub reporter: &'a Reporter,
    /// Resolves the executable path; only the image-load step asks.
    pub executable_path: &'a dyn Fn() -> PathBuf,
}

/// One independent mitigation.
pub struct MitigationStep<M: ?Sized> {
    pub policy: MitigationPolicy,
    /// `Some(message)`: start from the current policy word, reporting
    /// `message` if it cannot be read.  `None`: start from zero.
    pub query: Option<&'static str>,
    /// Sets this step's bits on the starting word.
    pub mutate: fn(u32, &M, &HardenEnv<'_>) -> u32,
    /// Reported when installing the policy fails.
    pub install_failure: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepFailure {
    pub code: ErrorCode,
    pub message: &'static str,
}

impl<M: MitigationApi + ?Sized> MitigationStep<M> {
    pub fn apply(&self, api: &M, env: &HardenEnv<'_>) -> Result<(), StepFailure> {
        let current = match self.query {
            Some(message) => api
                .query_policy(self.policy)
                .map_err(|code| StepFailure { code, message })?,
            None => 0,
        };

        let updated = (self.mutate)(current, api, env);
        api.install_policy(self.policy, updated)
            .map_err(|code| StepFailure {
                code,
                message: self.install_failure,
            })
    }
}

fn aslr<M: ?Sized>(current: u32, _: &M, _: &HardenEnv<'_>) -> u32 {
    current | flags::ASLR_FORCE_RELOCATE_IMAGES | flags::ASLR_DISALLOW_STRIPPED_IMAGES
}

fn dynamic_code<M: ?Sized>(current: u32, _: &M, _: &HardenEnv<'_>) -> u32 {
    (current | flags::DYNAMIC_CODE_PROHIBIT)
        & !(flags::DYNAMIC_CODE_ALLOW_THREAD_OPT_OUT | flags::DYNAMIC_CODE_ALLOW_REMOTE_DOWNGRADE)
}

fn strict_handles<M: ?Sized>(current: u32, _: &M, _: &HardenEnv<'_>) -> u32 {
    current | flags::STRICT_HANDLE_RAISE_ON_INVALID | flags::STRICT_HANDLE_PERMANENTLY_ENABLED
}

fn extension_points<M: ?Sized>(current: u32, _: &M, _: &HardenEnv<'_>) -> u32 {
    current | flags::EXTENSION_POINT_DISABLE
}

fn signature<M: ?Sized>(current: u32, _: &M, _: &HardenEnv<'_>) -> u32 {
    current | flags::SIGNATURE_MITIGATION_OPT_IN
}

fn image_load<M: MitigationApi + ?Sized>(current: u32, api: &M, env: &HardenEnv<'_>) -> u32 {
    let mut updated =
        current | flags::IMAGE_LOAD_NO_LOW_LABEL | flags::IMAGE_LOAD_PREFER_SYSTEM32;

    // Remote images stay allowed when the executable is itself on a remote
    // drive, or when its volume cannot be determined.
    match api.volume_path(&(env.executable_path)()) {
        Ok(volume) if !api.is_remote_drive(&volume) => updated |= flags::IMAGE_LOAD_NO_REMOTE,
        Ok(_) => {}
        Err(code) => env
            .reporter
            .report(code, Severity::Log, "Unable to get volume path name."),
    }
    updated
}

/// The hardening table, in application order.
pub fn steps<M: MitigationApi + ?Sized>() -> [MitigationStep<M>; 6] {
    [
        MitigationStep {
            policy: MitigationPolicy::Aslr,
            query: Some("Couldn't get current ASLR policy."),
            mutate: aslr::<M>,
            install_failure: "Couldn't disallow stripped images.",
        },
        MitigationStep {
            policy: MitigationPolicy::DynamicCode,
            query: None,
            mutate: dynamic_code::<M>,
            install_failure: "Couldn't disable dynamic code generation.",
        },
        MitigationStep {
            policy: MitigationPolicy::StrictHandleCheck,
            query: None,
            mutate: strict_handles::<M>,
            install_failure: "Couldn't enable strict handle checks.",
        },
        MitigationStep {
            policy: MitigationPolicy::ExtensionPointDisable,
            query: None,
            mutate: extension_points::<M>,
            install_failure: "Couldn't disable extension point DLLs.",
        },
        MitigationStep {
            policy: MitigationPolicy::Signature,
            query: None,
            mutate: signature::<M>,
            install_failure: "Couldn't enable image signature enforcement.",
        },
        MitigationStep {
            policy: MitigationPolicy::ImageLoad,
            query: None,
            mutate: image_load::<M>,
            install_failure: "Couldn't set image load policy.",
        },
    ]
}

/// Apply every step, reporting and skipping past each failure.
pub fn harden_process<M: MitigationApi + ?Sized>(
    api: &M,
    reporter: &Reporter,
    executable_path: &dyn Fn() -> PathBuf,
) {
    let env = HardenEnv {
        reporter,
        executable_path,
    };

    for step in steps::<M>() {
        match step.apply(api, &env) {
            Ok(()) => log::debug!("applied {:?} mitigation", step.policy),
            Err(StepFailure { code, message }) => reporter.report(code, Severity::Log, message),
        }
    }
}
