mod impls;

/// Rewrites `verifier.assume` / `verifier.assume.not` calls into
/// `__VERIFIER_assume`.
#[derive(Default)]
pub struct RenameAssume {}
