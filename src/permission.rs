//! Microphone permission gate.
//!
//! Recording is only allowed once the platform has granted microphone
//! access. The check is a seam so tests and permissionless platforms can
//! substitute their own answer; desktop builds default to granted.

/// Answers whether microphone access has been granted.
pub trait MicrophonePermission: Send + Sync {
    fn is_granted(&self) -> bool;
}

/// Permission is implicit (typical desktop audio stacks).
#[derive(Debug, Clone, Copy, Default)]
pub struct GrantedPermission;

impl MicrophonePermission for GrantedPermission {
    fn is_granted(&self) -> bool {
        true
    }
}

/// Permission is absent; every recording attempt must be rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeniedPermission;

impl MicrophonePermission for DeniedPermission {
    fn is_granted(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn granted_and_denied() {
        assert!(GrantedPermission.is_granted());
        assert!(!DeniedPermission.is_granted());
    }

    #[test]
    fn permission_trait_is_object_safe() {
        let gate: Box<dyn MicrophonePermission> = Box::new(GrantedPermission);
        assert!(gate.is_granted());
    }
}
