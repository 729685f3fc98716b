// A poisoned lock means another thread panicked while holding the latch state. We can no
// longer trust that state to be coherent, so the only safe reaction is to panic as well.
pub(crate) const ERR_POISONED_LOCK: &str = "encountered poisoned lock - latch state may be \
    incoherent after a panic on another thread, so continued execution is not safe";
