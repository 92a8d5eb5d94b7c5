use super::machine::{Machine, Mode, line_len, strip_cr};
use crate::{backtick::match_fence_close, cursor::Scan, grammar::Grammar};

impl Machine {
    /// Code block info string, up to the end of the opening line.
    pub(super) fn code_block_info(&mut self, rest: &str) -> usize {
        let len = rest.find('\n').unwrap_or(rest.len());
        let Mode::CodeBlockInfo { info, .. } = &mut self.mode else {
            return 0;
        };
        info.push_str(&rest[..len]);
        if len == rest.len() {
            return len;
        }

        if let Mode::CodeBlockInfo { fence, mut info } =
            std::mem::replace(&mut self.mode, Mode::FreeText)
        {
            strip_cr(&mut info);
            let fence_len = fence.len();
            self.start_code_block(fence, info);
            self.mode = Mode::CodeBlockContent { fence_len };
        }
        self.at_line_start = true;
        len + 1
    }

    pub(super) fn code_block_content(
        &mut self,
        rest: &str,
        fence_len: usize,
        eof: bool,
    ) -> Scan<usize> {
        if self.at_line_start && rest.starts_with(Grammar::TICK) {
            match match_fence_close(rest, fence_len, eof) {
                Scan::NeedMore => return Scan::NeedMore,
                Scan::Ready(Some(close)) => {
                    self.finish_code_block(rest[..close.run_len].to_string());
                    self.at_line_start = true;
                    return Scan::Ready(close.line_len);
                }
                Scan::Ready(None) => {}
            }
        }

        let len = line_len(rest);
        self.text(&rest[..len]);
        self.at_line_start = rest[..len].ends_with('\n');
        Scan::Ready(len)
    }
}
