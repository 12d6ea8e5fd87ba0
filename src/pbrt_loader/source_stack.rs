use std::path::{Path, PathBuf};

use eyre::{Result, WrapErr};
use tracing::debug;

use super::{
    lexer::{Lexeme, Lexer},
    ParseError,
};

struct Source {
    lexer: Lexer,
    /// Used for error reporting, `None` for in-memory text
    path: Option<PathBuf>,
    directory: PathBuf,
}

impl Source {
    fn open(path: &Path) -> Result<Self> {
        let txt = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Couldn't read scene file '{}'", path.display()))?;

        let directory = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Ok(Self {
            lexer: Lexer::new(txt),
            path: Some(path.to_path_buf()),
            directory,
        })
    }
}

/// Stack of open scene files, the most recently included one on top.
///
/// Exhausted includes are popped transparently, only the root source reports [`Lexeme::Eof`].
pub struct SourceStack {
    root: Source,
    included: Vec<Source>,
    max_depth: usize,
}

impl SourceStack {
    pub fn open(path: &Path, max_depth: usize) -> Result<Self> {
        Ok(Self {
            root: Source::open(path)?,
            included: Vec::new(),
            max_depth,
        })
    }

    pub fn from_text(txt: &str, directory: PathBuf, max_depth: usize) -> Self {
        Self {
            root: Source {
                lexer: Lexer::new(txt.to_string()),
                path: None,
                directory,
            },
            included: Vec::new(),
            max_depth,
        }
    }

    /// Pushes the file `name`, resolved against the directory of the file currently being read.
    pub fn include(&mut self, name: &str) -> Result<()> {
        if self.included.len() >= self.max_depth {
            return Err(ParseError::IncludeTooDeep(self.max_depth).into());
        }

        let path = self.current_directory().join(name);
        debug!("Including '{}'", path.display());

        let source = Source::open(&path)?;
        self.included.push(source);
        Ok(())
    }

    pub fn peek(&mut self) -> Result<&Lexeme> {
        self.pop_exhausted()?;
        self.top_mut().lexer.peek()
    }

    pub fn next(&mut self) -> Result<Lexeme> {
        self.pop_exhausted()?;
        self.top_mut().lexer.next()
    }

    pub fn current_directory(&self) -> &Path {
        &self.top().directory
    }

    /// `<file>:<line>` of the source currently being read.
    pub fn location(&self) -> String {
        let top = self.top();
        let name = match &top.path {
            Some(p) => p.display().to_string(),
            None => String::from("<string>"),
        };

        format!("{}:{}", name, top.lexer.line())
    }

    #[cfg(test)]
    pub fn depth(&self) -> usize {
        self.included.len()
    }

    fn pop_exhausted(&mut self) -> Result<()> {
        while !self.included.is_empty() && self.top_mut().lexer.peek()? == &Lexeme::Eof {
            if let Some(source) = self.included.pop() {
                if let Some(path) = source.path {
                    debug!("Finished include '{}'", path.display());
                }
            }
        }

        Ok(())
    }

    fn top(&self) -> &Source {
        self.included.last().unwrap_or(&self.root)
    }

    fn top_mut(&mut self) -> &mut Source {
        self.included.last_mut().unwrap_or(&mut self.root)
    }
}
