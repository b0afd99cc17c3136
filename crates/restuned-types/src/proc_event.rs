#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcEventKind {
    Ignore,
    AppOpen,
    AppClose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcEvent {
    pub pid: i32,
    pub tgid: i32,
    pub kind: ProcEventKind,
}
