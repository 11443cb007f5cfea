//! Lua scripts for atomic room operations on Redis.
//!
//! Redis executes a script without interleaving other commands, which is what
//! makes the capacity check and the membership append a single step. The
//! membership list lives as a JSON array in the `connected` field of the
//! metadata hash and is decoded/encoded with the built-in `cjson` library.

/// Lua script for atomic admission.
///
/// Arguments:
/// - KEYS[1]: Metadata key (`meta:{id}`)
/// - KEYS[2]: Session-binding key (`session:{id}`)
/// - ARGV[1]: Existing token supplied by the caller, or empty string
/// - ARGV[2]: Candidate token to append
/// - ARGV[3]: Room capacity
/// - ARGV[4]: Admission timestamp (Unix ms)
///
/// Returns:
/// - 0: Room missing
/// - 1: Existing token already a member (no change)
/// - 2: Room full (no change)
/// - 3: Candidate admitted
pub const ADMIT_MEMBER: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 0 then
    return 0
end

local raw = redis.call('HGET', KEYS[1], 'connected')
local connected = {}
if raw then
    connected = cjson.decode(raw)
end

if ARGV[1] ~= '' then
    for _, token in ipairs(connected) do
        if token == ARGV[1] then
            return 1
        end
    end
end

local capacity = tonumber(ARGV[3])
if capacity == nil or #connected >= capacity then
    return 2
end

table.insert(connected, ARGV[2])
redis.call('HSET', KEYS[1], 'connected', cjson.encode(connected))
redis.call('HSET', KEYS[2], ARGV[2], ARGV[4])

-- Session key shares the metadata lifetime
local ttl = redis.call('PTTL', KEYS[1])
if ttl > 0 then
    redis.call('PEXPIRE', KEYS[2], ttl)
end

return 3
"#;

/// Lua script for message append with TTL reconciliation.
///
/// Arguments:
/// - KEYS[1]: Metadata key (`meta:{id}`)
/// - KEYS[2]: Message log key (`messages:{id}`)
/// - KEYS[3]: Session-binding key (`session:{id}`)
/// - ARGV[1]: JSON-encoded message
///
/// Returns:
/// - -2: Room missing (nothing written)
/// - -1: Appended, metadata has no expiry
/// - n >= 0: Appended, secondary keys now expire in n milliseconds
pub const APPEND_MESSAGE: &str = r#"
local ttl = redis.call('PTTL', KEYS[1])
if ttl == -2 then
    return -2
end

redis.call('RPUSH', KEYS[2], ARGV[1])

if ttl > 0 then
    redis.call('PEXPIRE', KEYS[2], ttl)
    redis.call('PEXPIRE', KEYS[3], ttl)
end

return ttl
"#;

/// Return code for a missing room, shared by both scripts' callers.
pub const ADMIT_ROOM_MISSING: i64 = 0;
/// Return code for an existing member.
pub const ADMIT_ALREADY_MEMBER: i64 = 1;
/// Return code for a full room.
pub const ADMIT_FULL: i64 = 2;
/// Return code for a new admission.
pub const ADMIT_ADMITTED: i64 = 3;

/// Return code for an append against a missing room.
pub const APPEND_ROOM_MISSING: i64 = -2;
