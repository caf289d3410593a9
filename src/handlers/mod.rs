// Two-tier handler layout:
// Public (no auth: registration, login, AI generation) -> Protected (bearer + tenant context)
pub mod protected;
pub mod public;
