//! The operator read-eval loop.

use std::{
    io::Write,
    sync::Arc,
};

use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::{mpsc, watch},
};
use webtask_server::{CommandRouter, ResultEvent};

use crate::{
    command::{ConsoleCommand, ShowTarget},
    env::{ConsoleEnv, RHOST},
};

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// What the loop does after a line is handled.
#[derive(Debug, PartialEq, Eq)]
enum Action {
    /// Prompt for the next line.
    Continue,
    /// Block until the wait gate is released.
    Wait,
    /// Shut the process down.
    Exit,
}

/// The interactive console.
///
/// Fully synchronous per command: after `exec` the loop waits for the
/// gate to release (a result from the awaited host, or its expiry)
/// before prompting again. Result events arriving at any other time are
/// printed between prompts.
pub struct ConsoleController {
    router: Arc<CommandRouter>,
    events: mpsc::UnboundedReceiver<ResultEvent>,
    shutdown: watch::Sender<bool>,
    env: ConsoleEnv,
}

impl ConsoleController {
    /// Build a console over the shared router, the result event stream,
    /// and the process-wide shutdown flag.
    #[must_use]
    pub fn new(
        router: Arc<CommandRouter>,
        events: mpsc::UnboundedReceiver<ResultEvent>,
        shutdown: watch::Sender<bool>,
    ) -> Self {
        Self {
            router,
            events,
            shutdown,
            env: ConsoleEnv::new(),
        }
    }

    /// Run the loop over stdin until `exit` or end of input.
    pub async fn run(mut self) {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        println!("{GREEN} * Ready!{RESET}\n");

        loop {
            self.prompt();
            tokio::select! {
                line = lines.next_line() => {
                    let Ok(Some(line)) = line else {
                        // Stdin closed under us; treat it as exit.
                        tracing::info!("console input closed, shutting down");
                        let _ = self.shutdown.send(true);
                        return;
                    };
                    match self.handle_line(&line).await {
                        Action::Continue => {}
                        Action::Wait => self.wait_for_release().await,
                        Action::Exit => return,
                    }
                }
                Some(event) = self.events.recv() => print_event(&event),
            }
        }
    }

    async fn handle_line(&mut self, line: &str) -> Action {
        match ConsoleCommand::parse(line) {
            ConsoleCommand::Empty => Action::Continue,
            ConsoleCommand::Help => {
                print_help();
                Action::Continue
            }
            ConsoleCommand::Set { name, value } => {
                println!("Assigned {name} -> {value}");
                self.env.set(name, value);
                Action::Continue
            }
            ConsoleCommand::Show(target) => {
                self.show(&target).await;
                Action::Continue
            }
            ConsoleCommand::Exec { script } => self.exec(&script).await,
            ConsoleCommand::Exit => {
                println!("Quitting...");
                let _ = self.shutdown.send(true);
                Action::Exit
            }
            ConsoleCommand::Unknown(word) => {
                println!("{RED}Unknown command: {word}{RESET}");
                Action::Continue
            }
        }
    }

    async fn show(&self, target: &ShowTarget) {
        match target {
            ShowTarget::Sessions => {
                let sessions = self.router.registry().snapshot().await;
                if sessions.is_empty() {
                    println!("{RED}No active sessions{RESET}");
                    return;
                }
                println!("\n{:<20} | TTL (sec)", "Hostname");
                println!("{}", "-".repeat(80));
                for info in sessions {
                    println!("{:<20} | {:<60}", info.host, info.ttl);
                }
                println!();
            }
            ShowTarget::All => {
                println!("\n{:<20} | Value", "Variable");
                println!("{}", "-".repeat(80));
                for (name, value) in self.env.iter() {
                    println!("{name:<20} | {value:<20}");
                }
                println!();
            }
            ShowTarget::Var(name) => match self.env.get(name) {
                Some(value) => println!("{name} -> {value}"),
                None => println!("{RED}Unrecognised variable{RESET}"),
            },
        }
    }

    /// Queue `script` for every host in `RHOST`.
    ///
    /// With several hosts only one can be waited on; the gate is armed on
    /// the last host that actually accepted the command, and the rest are
    /// fire-and-forget. If no host accepted there is nothing to wait for.
    async fn exec(&mut self, script: &str) -> Action {
        let Some(rhost) = self.env.rhost() else {
            println!("{RED}No RHOST selected{RESET}");
            return Action::Continue;
        };
        if script.is_empty() {
            println!("{RED}No script provided{RESET}");
            return Action::Continue;
        }

        let hosts: Vec<String> = rhost.split_whitespace().map(str::to_string).collect();
        let mut awaited = None;
        for host in hosts {
            if self.router.enqueue(&host, script).await {
                awaited = Some(host);
            } else {
                println!("{RED}No active session for {host}, command dropped{RESET}");
            }
        }

        match awaited {
            Some(host) => {
                self.router.gate().block_on(host);
                Action::Wait
            }
            None => Action::Continue,
        }
    }

    /// Sit in the WAIT state, printing results as they arrive, until the
    /// gate releases.
    async fn wait_for_release(&mut self) {
        let gate = Arc::clone(self.router.gate());
        loop {
            tokio::select! {
                () = gate.released() => return,
                Some(event) = self.events.recv() => print_event(&event),
            }
        }
    }

    fn prompt(&self) {
        let rhost = self.env.get(RHOST).unwrap_or("none");
        print!("({GREEN}{rhost}{RESET})> ");
        let _ = std::io::stdout().flush();
    }
}

fn print_event(event: &ResultEvent) {
    match &event.response {
        Some(response) => println!(
            "{}: Status={}, Response={}",
            event.host, event.status, response
        ),
        None => println!("{}: Status={}", event.host, event.status),
    }
}

fn print_help() {
    println!("\n{:<13} | {:<36} | Syntax", "Command", "Description");
    println!("{}", "-".repeat(80));
    println!("{:<13} | {:<36} | set <varname> <value>", "set", "Sets an environment variable.");
    println!("{:<13} | {:<36} | show (varname|all)", "show", "Shows an environment variable.");
    println!("{:<13} | {:<36} | show sessions", "show sessions", "Shows all active sessions.");
    println!("{:<13} | {:<36} | exit|quit", "exit", "Shuts down the server.");
    println!("{:<13} | {:<36} | exec <script>", "exec", "Run a script in the agent's browser.");
    println!();
}

#[cfg(test)]
mod tests {
    use webtask_core::{NOOP_SENTINEL, SessionRegistry, WaitGate};

    use super::*;

    fn console() -> (ConsoleController, watch::Receiver<bool>) {
        let registry = Arc::new(SessionRegistry::in_memory(3));
        let gate = Arc::new(WaitGate::new());
        let (router, events) = CommandRouter::new(registry, gate);
        let (shutdown, shutdown_rx) = watch::channel(false);
        (
            ConsoleController::new(Arc::new(router), events, shutdown),
            shutdown_rx,
        )
    }

    #[tokio::test]
    async fn exec_without_rhost_is_an_error_not_a_wait() {
        let (mut console, _rx) = console();
        assert_eq!(console.handle_line("exec alert(1)").await, Action::Continue);
        assert_eq!(console.router.gate().blocked_host(), None);
    }

    #[tokio::test]
    async fn exec_without_script_is_an_error_not_a_wait() {
        let (mut console, _rx) = console();
        console.handle_line("set RHOST a.test").await;
        assert_eq!(console.handle_line("exec").await, Action::Continue);
        assert_eq!(console.router.gate().blocked_host(), None);
    }

    #[tokio::test]
    async fn exec_queues_and_arms_the_gate() {
        let (mut console, _rx) = console();
        console.router.registry().get_or_create("a.test").await;
        console.handle_line("set RHOST a.test").await;

        assert_eq!(console.handle_line("exec alert(1)").await, Action::Wait);
        assert_eq!(
            console.router.gate().blocked_host().as_deref(),
            Some("a.test")
        );
        assert_eq!(
            console.router.registry().consume_next("a.test").await.as_deref(),
            Some("alert(1)")
        );
    }

    #[tokio::test]
    async fn exec_for_unknown_host_drops_without_blocking() {
        let (mut console, _rx) = console();
        console.handle_line("set RHOST ghost.test").await;

        assert_eq!(console.handle_line("exec alert(1)").await, Action::Continue);
        assert_eq!(console.router.gate().blocked_host(), None);
    }

    #[tokio::test]
    async fn multi_host_exec_waits_on_the_last_accepting_host() {
        let (mut console, _rx) = console();
        for host in ["a.test", "b.test"] {
            console.router.registry().get_or_create(host).await;
        }
        console.handle_line("set RHOST a.test b.test ghost.test").await;

        assert_eq!(console.handle_line("exec alert(1)").await, Action::Wait);
        assert_eq!(
            console.router.gate().blocked_host().as_deref(),
            Some("b.test")
        );
        // Both live hosts got the command.
        assert_eq!(
            console.router.next_command("a.test").await,
            "alert(1)"
        );
        assert_eq!(
            console.router.next_command("b.test").await,
            "alert(1)"
        );
        assert_eq!(
            console.router.next_command("ghost.test").await,
            NOOP_SENTINEL
        );
    }

    #[tokio::test]
    async fn wait_ends_once_the_result_lands() {
        let (mut console, _rx) = console();
        console.router.registry().get_or_create("a.test").await;
        console.handle_line("set RHOST a.test").await;
        assert_eq!(console.handle_line("exec alert(1)").await, Action::Wait);

        console
            .router
            .accept_result("a.test", "200", Some("1".into()))
            .await;
        console.wait_for_release().await;
        assert_eq!(console.router.gate().blocked_host(), None);
    }

    #[tokio::test]
    async fn exit_flips_the_shutdown_flag() {
        let (mut console, rx) = console();
        assert_eq!(console.handle_line("exit").await, Action::Exit);
        assert!(*rx.borrow());
    }

    #[tokio::test]
    async fn unknown_commands_do_not_stop_the_loop() {
        let (mut console, rx) = console();
        assert_eq!(console.handle_line("frobnicate").await, Action::Continue);
        assert!(!*rx.borrow());
    }
}
