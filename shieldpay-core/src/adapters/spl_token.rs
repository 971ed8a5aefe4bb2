//! Ledger client backed by the `solana` and `spl-token` command-line tools
//!
//! Each operation runs one command, waits for it to exit and parses its
//! stdout. A non-zero exit is reported with the tool's stderr untouched.

use std::process::Command;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::domain::result::LedgerError;
use crate::domain::{Holdings, Receipt, Signer};
use crate::ports::{LedgerClient, LedgerResult};

/// Ledger client that drives the Solana CLI tools
#[derive(Debug, Clone)]
pub struct SplTokenCli {
    solana_bin: String,
    spl_token_bin: String,
    rpc_url: Option<String>,
}

impl SplTokenCli {
    pub fn new(solana_bin: impl Into<String>, spl_token_bin: impl Into<String>) -> Self {
        Self {
            solana_bin: solana_bin.into(),
            spl_token_bin: spl_token_bin.into(),
            rpc_url: None,
        }
    }

    /// Point both tools at a specific RPC endpoint instead of their own config
    pub fn with_rpc_url(mut self, rpc_url: Option<String>) -> Self {
        self.rpc_url = rpc_url;
        self
    }

    fn run(&self, program: &str, args: &[String]) -> LedgerResult<String> {
        let mut command = Command::new(program);
        command.args(args);
        if let Some(url) = &self.rpc_url {
            command.args(["--url", url]);
        }

        let output = command
            .output()
            .map_err(|e| LedgerError::new(None, format!("failed to run {}: {}", program, e)))?;

        if !output.status.success() {
            return Err(LedgerError::new(
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn spl_token(&self, args: Vec<String>) -> LedgerResult<String> {
        self.run(&self.spl_token_bin, &args)
    }

    fn signed(&self, args: Vec<String>) -> LedgerResult<Receipt> {
        let stdout = self.spl_token(args)?;
        let signature = last_token(&stdout)?;
        Ok(Receipt::new(signature, stdout))
    }
}

fn key_arg(owner: &Signer) -> String {
    owner.key_path.display().to_string()
}

/// First token of `solana balance` output ("0.05 SOL")
pub fn parse_native_balance(stdout: &str) -> LedgerResult<Decimal> {
    let token = stdout
        .split_whitespace()
        .next()
        .ok_or_else(|| LedgerError::new(Some(0), "empty balance output"))?;
    Decimal::from_str(token).map_err(|_| {
        LedgerError::new(
            Some(0),
            format!("unexpected balance output: {}", stdout.trim()),
        )
    })
}

/// Rows of `spl-token accounts`: a mint address followed by its balance.
///
/// Header, separator and any row whose first column is not a base-58
/// address are skipped.
pub fn parse_holdings(stdout: &str) -> Holdings {
    let mut holdings = Holdings::new();
    for line in stdout.lines() {
        let mut columns = line.split_whitespace();
        let Some(mint) = columns.next() else {
            continue;
        };
        if bs58::decode(mint).into_vec().map(|b| b.len() != 32).unwrap_or(true) {
            continue;
        }
        if let Some(balance) = columns.find_map(|c| Decimal::from_str(c).ok()) {
            holdings.insert(mint, balance);
        }
    }
    holdings
}

/// Transaction signature: the last whitespace-separated token of the output
pub fn last_token(stdout: &str) -> LedgerResult<String> {
    stdout
        .split_whitespace()
        .last()
        .map(str::to_string)
        .ok_or_else(|| LedgerError::new(Some(0), "no transaction signature in output"))
}

/// `spl-token create-account` prints the new account on its first line and
/// the signature on its last
pub fn parse_create_account(stdout: &str) -> LedgerResult<(String, String)> {
    let lines: Vec<&str> = stdout.lines().filter(|l| !l.trim().is_empty()).collect();
    let (Some(first), Some(last)) = (lines.first(), lines.last()) else {
        return Err(LedgerError::new(Some(0), "empty create-account output"));
    };
    let account = last_token(first)?;
    let signature = last_token(last)?;
    Ok((account, signature))
}

impl LedgerClient for SplTokenCli {
    fn name(&self) -> &str {
        "spl-token"
    }

    fn query_balance(&self, public_id: &str) -> LedgerResult<Decimal> {
        let stdout = self.run(&self.solana_bin, &["balance".to_string(), public_id.to_string()])?;
        parse_native_balance(&stdout)
    }

    fn list_holdings(&self, owner: &Signer) -> LedgerResult<Holdings> {
        let stdout = self.spl_token(vec!["accounts".into(), "--owner".into(), key_arg(owner)])?;
        Ok(parse_holdings(&stdout))
    }

    fn transfer(
        &self,
        owner: &Signer,
        mint: &str,
        amount: Decimal,
        destination: &str,
        confidential: bool,
    ) -> LedgerResult<Receipt> {
        let mut args = vec![
            "transfer".into(),
            "--owner".into(),
            key_arg(owner),
            mint.to_string(),
            amount.to_string(),
            destination.to_string(),
        ];
        if confidential {
            args.push("--confidential".into());
        }
        self.signed(args)
    }

    fn create_holding_account(
        &self,
        owner: &Signer,
        mint: &str,
    ) -> LedgerResult<(String, Receipt)> {
        let stdout = self.spl_token(vec![
            "create-account".into(),
            "--owner".into(),
            key_arg(owner),
            mint.to_string(),
        ])?;
        let (account, signature) = parse_create_account(&stdout)?;
        Ok((account, Receipt::new(signature, stdout)))
    }

    fn configure_confidential(&self, owner: &Signer, mint: &str) -> LedgerResult<Receipt> {
        self.signed(vec![
            "configure-confidential-transfer-account".into(),
            "--owner".into(),
            key_arg(owner),
            mint.to_string(),
        ])
    }

    fn apply_pending_balance(&self, owner: &Signer, mint: &str) -> LedgerResult<Receipt> {
        self.signed(vec![
            "apply-pending-balance".into(),
            mint.to_string(),
            "--owner".into(),
            key_arg(owner),
        ])
    }

    fn withdraw_shielded(
        &self,
        owner: &Signer,
        mint: &str,
        amount: Decimal,
    ) -> LedgerResult<Receipt> {
        self.signed(vec![
            "withdraw-confidential-tokens".into(),
            mint.to_string(),
            amount.to_string(),
            "--owner".into(),
            key_arg(owner),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USDC: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
    const CNF: &str = "CNfuSdLitgsFyRKhpaAVA2WM9q8wbEgvksJRvwgVoak3";

    #[test]
    fn test_parse_native_balance() {
        assert_eq!(parse_native_balance("0.05 SOL\n").unwrap(), Decimal::new(5, 2));
        assert!(parse_native_balance("").is_err());
        assert!(parse_native_balance("Error: invalid").is_err());
    }

    #[test]
    fn test_parse_holdings() {
        let stdout = format!(
            "Token                                         Balance\n\
             ---------------------------------------------------------------\n\
             {}  0.5\n\
             {}  0.42  (Aux-1*)\n",
            USDC, CNF
        );
        let holdings = parse_holdings(&stdout);
        assert_eq!(holdings.balance(USDC), Some(Decimal::new(5, 1)));
        assert_eq!(holdings.balance(CNF), Some(Decimal::new(42, 2)));
        assert_eq!(holdings.balances.len(), 2);
    }

    #[test]
    fn test_last_token() {
        let signature =
            "5VERv8NMvzbJMEkV8xnrLkEaWRtSz9CosKDYjCJjBRnbJLgp8uirBgmQpjKhoR4tjF3ZpRzrFmBV6UjKdiSZkQUW";
        let stdout = format!("Transfer 0.42 tokens\n  Sender: a\n\nSignature: {}\n", signature);
        assert_eq!(last_token(&stdout).unwrap(), signature);
        assert!(last_token("  \n").is_err());
    }

    #[test]
    fn test_parse_create_account_takes_two_tokens_from_one_output() {
        let stdout =
            "Creating account 7UX2i7SucgLMQcfZ75s3VXmZZY4YRUyJN9X1RgfMoDUi\n\nSignature: 4sig\n";
        let (account, signature) = parse_create_account(stdout).unwrap();
        assert_eq!(account, "7UX2i7SucgLMQcfZ75s3VXmZZY4YRUyJN9X1RgfMoDUi");
        assert_eq!(signature, "4sig");
    }

    #[test]
    fn test_missing_binary_reports_ledger_error() {
        let cli = SplTokenCli::new("shieldpay-no-such-solana", "shieldpay-no-such-spl-token");
        let err = cli.query_balance("addr").unwrap_err();
        assert_eq!(err.exit_code, None);
        assert!(err.stderr.contains("shieldpay-no-such-solana"));
    }
}
