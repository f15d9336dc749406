use super::{Flags, Tokenizer};
use crate::errors::TokenizerError;
use crate::token::TokenSink;

/// Handle a script engine uses to write markup back into the document
/// mid-execution.
///
/// Writes land in the tokenizer's script-output buffer and are tokenized
/// after the execution window closes. This is the reentrancy guard: engine
/// output is buffered, never dispatched recursively, so stack depth stays
/// bounded and token order matches the logical arrival order.
pub struct ScriptOutput<'t> {
    buf: &'t mut String,
}

impl<'t> ScriptOutput<'t> {
    pub(super) fn new(buf: &'t mut String) -> Self {
        ScriptOutput { buf }
    }

    pub fn write(&mut self, markup: &str) {
        self.buf.push_str(markup);
    }
}

/// Executes script content synchronously.
///
/// Invoked when an inline `script` element closes (if its content
/// classifies as executable) and when an external fetch completes.
pub trait ScriptEngine {
    fn execute(&mut self, source: &str, doc: &mut ScriptOutput<'_>);
}

/// Receives fetch requests for `script` elements with a `src` reference.
///
/// The tokenizer suspends after `request` returns; the host resumes it by
/// calling [`Tokenizer::on_external_script_loaded`] exactly once per
/// request.
pub trait ScriptLoader {
    fn request(&mut self, request: &ScriptFetchRequest);
}

/// Correlates one external script fetch with the suspension it caused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptFetchRequest {
    pub id: u64,
    pub url: String,
}

/// Decides whether a `script` element's content is executable, given its
/// `language` and `type` attribute values. `language` wins when present;
/// absent both, content defaults to executable.
pub trait ScriptTypeClassifier {
    fn is_executable(&self, language: Option<&str>, content_type: Option<&str>) -> bool;
}

/// Default classifier: ECMAScript dialects.
///
/// `type` values are parsed as MIME types where possible; `language` values
/// (and unparseable `type` values) fall back to the legacy substring check.
#[derive(Debug, Default, Copy, Clone)]
pub struct EcmaScriptClassifier;

impl ScriptTypeClassifier for EcmaScriptClassifier {
    fn is_executable(&self, language: Option<&str>, content_type: Option<&str>) -> bool {
        if let Some(language) = language {
            return is_ecma_dialect(language);
        }

        if let Some(content_type) = content_type {
            if let Ok(mime) = content_type.trim().parse::<mime::Mime>() {
                return is_ecma_dialect(mime.subtype().as_str());
            }

            return is_ecma_dialect(content_type);
        }

        true
    }
}

fn is_ecma_dialect(value: &str) -> bool {
    let value = value.to_ascii_lowercase();

    value.contains("javascript") || value.contains("ecmascript") || value.contains("jscript")
}

impl<S: TokenSink> Tokenizer<S> {
    /// Resumes a tokenizer suspended on an external script fetch.
    ///
    /// `content` is executed under the reentrancy guard, then everything the
    /// execution wrote followed by everything that arrived during the
    /// suspension is re-submitted, reproducing pre-suspension arrival order.
    pub fn on_external_script_loaded(&mut self, content: &str) -> Result<(), TokenizerError> {
        if self.pending_fetch.take().is_none() {
            return Err(TokenizerError::NoPendingFetch);
        }

        self.execute_script(content);
        self.flags.remove(Flags::LOADING_EXTERNAL_SCRIPT);

        let output = std::mem::take(&mut self.script_output);
        let pending = std::mem::take(&mut self.pending_src);

        self.write(&output);

        // Script output and pre-suspension input stay separate tokens even
        // when both are plain text.
        self.flush_text();

        self.write(&pending);
        self.maybe_end();

        Ok(())
    }

    /// Runs the script gate after a `script` element closed: external `src`
    /// suspends on the loader, inline executable content runs synchronously
    /// and its output is spliced in ahead of the remaining input.
    pub(super) fn script_gate(&mut self, content: &str) {
        if let Some(url) = self.script_src.take() {
            if self.loader.is_some() {
                self.fetch_seq += 1;

                let request = ScriptFetchRequest {
                    id: self.fetch_seq,
                    url,
                };

                self.pending_fetch = Some(request.id);
                self.flags.insert(Flags::LOADING_EXTERNAL_SCRIPT);
                trace!(@suspend "external script fetch");

                // Detach what we have not tokenized yet; it resumes after
                // the fetched script has executed.
                let rest: String = self.src[self.pos..].iter().collect();

                self.pending_src.push_str(&rest);
                self.src.clear();
                self.pos = 0;

                if let Some(loader) = self.loader.as_mut() {
                    loader.request(&request);
                }
            }
        } else if self.script_executable {
            self.execute_script(content);
            self.splice_script_output();
        }
    }

    pub(super) fn execute_script(&mut self, source: &str) {
        if let Some(engine) = self.engine.as_mut() {
            self.flags.insert(Flags::EXECUTING_SCRIPT);
            engine.execute(source, &mut ScriptOutput::new(&mut self.script_output));
            self.flags.remove(Flags::EXECUTING_SCRIPT);
        }
    }

    // Inserts buffered script output ahead of the not-yet-tokenized input.
    fn splice_script_output(&mut self) {
        if self.script_output.is_empty() {
            return;
        }

        let output = std::mem::take(&mut self.script_output);
        let mut spliced: Vec<char> = output.chars().collect();

        spliced.extend_from_slice(&self.src[self.pos..]);
        self.src = spliced;
        self.pos = 0;
    }
}
