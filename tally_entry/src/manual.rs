/*!

This is the long-form manual for `tally_entry` and `tallyclient`.

## Barcode entry

Intake forms identify a result form by its barcode. The barcode can be entered in two ways:

* `scan`: the default. A single field receives the keystrokes of a hardware scanner. The scanner
  types the digits very quickly and terminates them with Enter. On Enter, the digits are copied
  into the field and the field becomes read-only.
* `manual`: the barcode is typed by hand, twice. While the copy is being typed, the first entry
  is hidden behind a placeholder. Once both have the same length, the first entry is shown again
  and both fields are marked as valid (identical) or invalid (different).

Exactly one of the two sets of fields is required at any time, so the browser never refuses to
submit a form because of a hidden field.

### Detection of manual typing

When a person starts typing in the scan field, the form switches to manual entry by itself.
The rule is simple: if the second keystroke (or any later keystroke of the same burst) comes more
than 100ms after the previous one, it cannot be a scanner. The scan field is emptied, the
form switches to manual mode, and a warning explains why.

The first keystroke never switches the mode. Leaving the field or emptying it starts a new burst.
A person typing very fast (two characters within 100ms) is taken for a scanner: the rule
prefers to never interrupt a real scan.

Partial scans are dropped after 200ms without any keystroke, so that they do not prefix the
next scan. Only digits are accepted from the scanner.

The submit button is enabled when the barcode has at least 11 characters (and, in manual mode,
when both entries are identical).

| setting             | default | configuration key   |
|---------------------|---------|---------------------|
| typing threshold    | 100ms   | `typingThresholdMs` |
| scan debounce       | 200ms   | `scanDebounceMs`    |
| minimum length      | 11      | `minBarcodeLength`  |

### Center details

Center and station numbers are also entered twice. The center number is compared once the copy
has 5 digits. The station number is compared as soon as the copy is not empty, but a difference
is only reported when the form is submitted.

## Batch import

A batch import is processed by the server in a fixed number of steps (5, or 7 on deployments
that import more files). For each step, the client repeatedly asks the server to process
elements starting at the current offset:

```text
POST <route>   offset=0&step=1
{"status": "OK", "elements_processed": 250}
POST <route>   offset=250&step=1
{"status": "OK", "elements_processed": 0}
```

When nothing new was processed, the step is done, whatever its announced total was. Some
deployments process a step in a background task instead:

```text
POST <route>   offset=0&step=3
{"status": "OK", "elements_processed": {"status": "PENDING", "result": null, "task_id": "f3a1"}}
POST <taskRoute>   step=3&task_id=f3a1          (every 30 seconds)
{"status": "OK", "elements_processed": {"status": "SUCCESS", "result": 1200, "done": true}}
```

When the last step is done, the client goes to the destination page. An `Error` status or a
`FAILURE` task stops the import: the message is displayed and the client goes back to the upload
page. A failed step is never retried.

Deviations from the browser client:
 - added `maxTaskPolls` (number, optional): stop waiting on a background task after this many
   polls. By default the client waits forever.
 - added `networkRetries` (number, default 0): when a request cannot reach the server, send it
   again this many times before giving up. The import can always be resumed later from the
   recorded offsets.

## Configuration

`tallyclient` reads a JSON configuration file (`--config`). All the keys are optional; flags
given on the command line override the file.

```text
{
  "server": {"baseUrl": "https://tally.example.org", "csrfToken": "...",
             "cookie": "sessionid=...; csrftoken=...", "timeoutMs": 60000},
  "tallyId": 1,
  "import": {"route": "/data/batch", "taskRoute": "/data/batch-task",
             "destination": "/super-administrator", "fallback": "/data/upload",
             "totalSteps": 5, "totals": [120, 40, 10, 3, 1], "offsets": [120, 12],
             "pollDelayMs": 30000, "maxTaskPolls": 20, "networkRetries": 2, "retryDelayMs": 1000},
  "entry": {"typingThresholdMs": 100, "scanDebounceMs": 200, "minBarcodeLength": 11},
  "routes": {"centersStations": "/ajax/get-centers-stations",
             "regions": "/ajax/get-sub-constituencies",
             "exports": {"result_forms": "/ajax/download-result-forms"}}
}
```

 */
