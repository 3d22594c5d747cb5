use serde_json::{json, Value};

fn read_tool_schemas() -> Vec<Value> {
    vec![
        json!({ "name": "get_balance", "description": "Balance of the agent wallet: native SOL, or an SPL token when `mint` is given.", "inputSchema": {
          "type": "object",
          "properties": {
            "mint": { "type": "string", "description": "SPL mint address or known symbol (USDC, BONK, ...). Omit for SOL." }
          },
          "additionalProperties": false
        }}),
        json!({ "name": "fetch_price", "description": "Current USD price of a token via Jupiter. Read-only.", "inputSchema": {
          "type": "object",
          "properties": {
            "mint": { "type": "string", "minLength": 1, "description": "Token mint address or known symbol." }
          },
          "required": ["mint"],
          "additionalProperties": false
        }}),
        json!({ "name": "get_tps", "description": "Current Solana transactions-per-second from recent performance samples. Read-only.", "inputSchema": {
          "type": "object",
          "properties": {
            "sample_count": { "type": "integer", "minimum": 1, "maximum": 720, "default": 1 }
          },
          "additionalProperties": false
        }}),
    ]
}

fn write_tool_schemas() -> Vec<Value> {
    vec![
        json!({ "name": "transfer", "description": "Transfer SOL or an SPL token from the agent wallet to a recipient.", "inputSchema": {
          "type": "object",
          "properties": {
            "to": { "type": "string", "minLength": 1, "description": "Recipient wallet address." },
            "amount": { "type": "string", "minLength": 1, "description": "UI-units decimal amount, e.g. \"1.5\"." },
            "mint": { "type": "string", "description": "SPL mint address or known symbol. Omit for native SOL." }
          },
          "required": ["to", "amount"],
          "additionalProperties": false
        }}),
        json!({ "name": "trade", "description": "Swap tokens through the Jupiter aggregator.", "inputSchema": {
          "type": "object",
          "properties": {
            "output_mint": { "type": "string", "minLength": 1, "description": "Target token mint address or known symbol." },
            "input_amount": { "type": "string", "minLength": 1, "description": "UI-units decimal amount of the input token." },
            "input_mint": { "type": "string", "description": "Source token mint. Defaults to USDC." },
            "slippage_bps": { "type": "integer", "minimum": 1, "maximum": 10000, "default": 300, "description": "Slippage tolerance in basis points." }
          },
          "required": ["output_mint", "input_amount"],
          "additionalProperties": false
        }}),
        json!({ "name": "stake", "description": "Stake SOL into jupSOL via Jupiter.", "inputSchema": {
          "type": "object",
          "properties": {
            "amount_sol": { "type": "string", "minLength": 1, "description": "SOL amount, UI-units decimal string." }
          },
          "required": ["amount_sol"],
          "additionalProperties": false
        }}),
        json!({ "name": "lend", "description": "Deposit USDC into Lulo for yield.", "inputSchema": {
          "type": "object",
          "properties": {
            "amount_usdc": { "type": "string", "minLength": 1, "description": "USDC amount, UI-units decimal string." }
          },
          "required": ["amount_usdc"],
          "additionalProperties": false
        }}),
        json!({ "name": "deploy_token", "description": "Deploy a new SPL mint with the agent wallet as mint and freeze authority.", "inputSchema": {
          "type": "object",
          "properties": {
            "decimals": { "type": "integer", "minimum": 0, "maximum": 9, "default": 9 }
          },
          "additionalProperties": false
        }}),
        json!({ "name": "request_faucet_funds", "description": "Request SOL from the cluster faucet (devnet/testnet endpoints only).", "inputSchema": {
          "type": "object",
          "properties": {
            "amount_sol": { "type": "string", "description": "SOL amount. Defaults to 5." }
          },
          "additionalProperties": false
        }}),
        json!({ "name": "burn_and_close_account", "description": "Burn any remaining balance of a token account and close it, reclaiming rent.", "inputSchema": {
          "type": "object",
          "properties": {
            "token_account": { "type": "string", "minLength": 1, "description": "Token account address to empty and close." }
          },
          "required": ["token_account"],
          "additionalProperties": false
        }}),
        json!({ "name": "create_dlmm_pool", "description": "Create a Meteora DLMM customizable permissionless pool for a token pair.", "inputSchema": {
          "type": "object",
          "properties": {
            "token_a_mint": { "type": "string", "minLength": 1 },
            "token_b_mint": { "type": "string", "minLength": 1 },
            "bin_step": { "type": "integer", "minimum": 1, "maximum": 65535, "description": "Bin step in basis points." },
            "initial_price": { "type": "number", "exclusiveMinimum": 0, "description": "Initial pool price as a tokenA/tokenB ratio." },
            "price_rounding_up": { "type": "boolean", "default": false },
            "fee_bps": { "type": "integer", "minimum": 1, "maximum": 65535, "description": "Pool trading fee in basis points." },
            "activation_type": { "type": "string", "enum": ["slot", "timestamp"] },
            "has_alpha_vault": { "type": "boolean", "default": false },
            "activation_point": { "type": "integer", "minimum": 0, "description": "Slot or unix timestamp per activation_type." }
          },
          "required": ["token_a_mint", "token_b_mint", "bin_step", "initial_price", "fee_bps", "activation_type"],
          "additionalProperties": false
        }}),
        json!({ "name": "launch_pumpfun_token", "description": "Launch a new token on pump.fun: uploads metadata, builds the create transaction, signs and submits it.", "inputSchema": {
          "type": "object",
          "properties": {
            "token_name": { "type": "string", "minLength": 1 },
            "token_ticker": { "type": "string", "minLength": 1 },
            "description": { "type": "string" },
            "image_url": { "type": "string", "minLength": 1, "description": "Image fetched and re-uploaded to pump.fun's IPFS." },
            "options": {
              "type": "object",
              "properties": {
                "twitter": { "type": "string" },
                "telegram": { "type": "string" },
                "website": { "type": "string" },
                "initial_liquidity_sol": { "type": "number", "minimum": 0, "description": "Initial dev buy in SOL." },
                "slippage_bps": { "type": "integer", "minimum": 0, "maximum": 10000 },
                "priority_fee": { "type": "integer", "minimum": 0, "description": "Priority fee in lamports." }
              },
              "additionalProperties": false
            }
          },
          "required": ["token_name", "token_ticker", "description", "image_url"],
          "additionalProperties": false
        }}),
    ]
}

/// The static descriptor table, built once at startup. Each schema mirrors
/// its adapter's request struct field-for-field.
pub fn tool_schemas() -> Vec<Value> {
    let mut schemas = read_tool_schemas();
    schemas.extend(write_tool_schemas());
    schemas
}

pub fn list_tools_result() -> Value {
    json!({ "tools": tool_schemas() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_descriptor_is_well_formed() {
        let schemas = tool_schemas();
        assert_eq!(schemas.len(), 12);
        for s in &schemas {
            let name = s.get("name").and_then(Value::as_str);
            assert!(name.is_some_and(|n| !n.is_empty()), "missing name: {s}");
            assert!(
                s.get("description").and_then(Value::as_str).is_some(),
                "missing description: {s}"
            );
            let input = s.get("inputSchema");
            assert!(
                input
                    .and_then(|i| i.get("type"))
                    .and_then(Value::as_str)
                    .is_some_and(|t| t == "object"),
                "inputSchema must be an object schema: {s}"
            );
            assert_eq!(
                input.and_then(|i| i.get("additionalProperties")),
                Some(&Value::Bool(false)),
                "schemas are closed, mirroring deny_unknown_fields: {s}"
            );
        }
    }

    #[test]
    fn tool_names_are_unique() {
        let schemas = tool_schemas();
        let mut names: Vec<&str> = schemas
            .iter()
            .filter_map(|s| s.get("name").and_then(Value::as_str))
            .collect();
        let before = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(before, names.len());
    }
}
