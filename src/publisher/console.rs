use crate::metric::Metric;
use crate::publisher::{Context, PublishError, Publisher};
use chrono::Utc;
use std::io::{self, Write};

/// Console publisher
///
/// Writes each metric as one line of JSON in its wire shape. Useful for
/// demonstration and for piping into another tool.
pub struct Console<W> {
    out: W,
}

impl Console<io::Stdout> {
    /// Create a Console that writes to stdout.
    pub fn stdout() -> Console<io::Stdout> {
        Console::new(io::stdout())
    }
}

impl<W> Console<W>
where
    W: Write,
{
    /// Create a Console that writes to `out`.
    pub fn new(out: W) -> Console<W> {
        Console { out }
    }

    /// Unwrap the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W> Publisher for Console<W>
where
    W: Write,
{
    fn publish(&mut self, ctx: &Context, metrics: &[Metric]) -> Result<(), PublishError> {
        ctx.check()?;
        debug!("Flushing {} metrics: {}", metrics.len(), Utc::now().to_rfc3339());

        let mut buf = Vec::with_capacity(metrics.len() * 128);
        for metric in metrics {
            serde_json::to_writer(&mut buf, metric)?;
            buf.push(b'\n');
        }
        self.out.write_all(&buf)?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::publisher::is_recoverable;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn writes_json_lines() {
        let mut m = Metric::gauge("foo", vec!["env:prod".into()], 60);
        m.points.push(vec![10.0, 1.5]);
        let other = Metric::gauge("bar", vec![], 60);

        let mut console = Console::new(Vec::new());
        console.publish(&Context::background(), &[m, other]).unwrap();

        let out = String::from_utf8(console.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(2, lines.len());
        assert_eq!(
            r#"{"interval":60,"metric":"foo","points":[[10.0,1.5]],"tags":["env:prod"],"type":"gauge"}"#,
            lines[0]
        );
        assert_eq!(
            r#"{"interval":60,"metric":"bar","points":[],"tags":[],"type":"gauge"}"#,
            lines[1]
        );
    }

    #[test]
    fn honors_expired_context() {
        let ctx = Context::with_timeout(Duration::from_millis(1));
        thread::sleep(Duration::from_millis(5));

        let mut console = Console::new(Vec::new());
        let err = console.publish(&ctx, &[Metric::gauge("foo", vec![], 1)]).unwrap_err();

        assert!(is_recoverable(&err));
        assert!(console.into_inner().is_empty());
    }
}
