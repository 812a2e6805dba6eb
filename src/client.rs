use crate::NodeId;

#[derive(Clone, Debug, PartialEq)]
pub struct CommandLineConfig {
    pub input: Option<String>,
    pub command: String,
    pub center: Option<NodeId>,
    pub radius: u32,
    pub zoom: f64,
}

impl CommandLineConfig {
    pub fn from_args(args: &[&str]) -> Result<Self, String> {
        let mut input = None;
        let mut command = String::from("status");
        let mut center = None;
        let mut radius = 10;
        let mut zoom = 1.0;
        let mut iter = args.iter().skip(1);
        while let Some(arg) = iter.next() {
            match *arg {
                "--input" | "-i" => {
                    input = Some(
                        iter.next()
                            .ok_or_else(|| "--input requires a value".to_string())?
                            .to_string(),
                    );
                }
                "--command" => {
                    command = iter
                        .next()
                        .ok_or_else(|| "--command requires a value".to_string())?
                        .to_string();
                }
                "--center" => {
                    let value = iter
                        .next()
                        .ok_or_else(|| "--center requires a value".to_string())?;
                    center = Some(
                        value
                            .parse()
                            .map_err(|_| format!("--center expects a node id, got {value}"))?,
                    );
                }
                "--radius" => {
                    let value = iter
                        .next()
                        .ok_or_else(|| "--radius requires a value".to_string())?;
                    radius = value
                        .parse()
                        .map_err(|_| format!("--radius expects a number, got {value}"))?;
                }
                "--zoom" => {
                    let value = iter
                        .next()
                        .ok_or_else(|| "--zoom requires a value".to_string())?;
                    zoom = value
                        .parse()
                        .map_err(|_| format!("--zoom expects a number, got {value}"))?;
                }
                other if other.starts_with('-') => {
                    return Err(format!("unknown flag {other}"));
                }
                _ => {
                    command = arg.to_string();
                }
            }
        }
        Ok(Self {
            input,
            command,
            center,
            radius,
            zoom,
        })
    }

    pub fn input(&self) -> Result<&str, String> {
        self.input
            .as_deref()
            .ok_or_else(|| format!("{} requires --input", self.command))
    }

    pub fn center(&self) -> Result<NodeId, String> {
        self.center
            .ok_or_else(|| format!("{} requires --center", self.command))
    }

    pub fn help() -> &'static str {
        "Usage: genograph [--command] parse|status|subgraph|topo|layout|remove --input PATH \
         [--center ID] [--radius N] [--zoom F]\n"
    }
}
