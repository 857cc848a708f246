use super::assembly::Label;

/// Hands out jump targets. There is one per generation run, shared by every
/// function and by the entry point, so a label number is never handed out twice
/// within a program.
#[derive(Debug, Default)]
pub struct LabelGenerator {
    current: usize,
}

impl LabelGenerator {
    pub const fn new() -> Self {
        Self { current: 0 }
    }
    pub fn new_label<'code>(&mut self) -> Label<'code> {
        let current = self.current;
        self.current += 1;
        Label::Numbered(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_sequential() {
        let mut labels = LabelGenerator::new();
        assert_eq!(labels.new_label(), Label::Numbered(0));
        assert_eq!(labels.new_label(), Label::Numbered(1));
    }

    #[test]
    fn separate_generators_do_not_interfere() {
        let mut a = LabelGenerator::new();
        let mut b = LabelGenerator::new();
        a.new_label();
        a.new_label();
        assert_eq!(b.new_label(), Label::Numbered(0));
        assert_eq!(a.new_label(), Label::Numbered(2));
    }
}
